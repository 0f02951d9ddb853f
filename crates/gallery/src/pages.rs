//! Static gallery pages.
//!
//! Three [upon] templates, embedded into the binary with [`rust-embed`]
//! (rust_embed) and compiled eagerly so syntax errors surface at startup
//! rather than halfway through a batch. The pages themselves are static
//! HTML that fetches the sibling JSON manifest client-side.

use crate::error::{ErrorKind, Result};
use crate::layout;
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;
use time::Date;
use upon::{Engine, Template};

#[derive(Embed)]
#[folder = "templates/"]
struct Templates;

/// Compiled gallery page templates.
pub struct Pages {
    engine: Engine<'static>,
    day: Template<'static>,
    year: Template<'static>,
    root: Template<'static>,
    site_title: String,
}

impl Pages {
    /// Compile the embedded templates. The title is what the site root page
    /// carries as its heading, usually the bucket name.
    pub fn new(site_title: impl Into<String>) -> Result<Self> {
        let engine = Engine::new();
        let day = Self::compile(&engine, "day.html")?;
        let year = Self::compile(&engine, "year.html")?;
        let root = Self::compile(&engine, "root.html")?;
        Ok(Self {
            engine,
            day,
            year,
            root,
            site_title: site_title.into(),
        })
    }

    fn compile(engine: &Engine<'static>, name: &str) -> Result<Template<'static>> {
        let asset = Templates::get(name).ok_or_raise(|| ErrorKind::TemplateAsset(name.to_string()))?;
        let source =
            String::from_utf8(asset.data.into_owned()).or_raise(|| ErrorKind::TemplateAsset(name.to_string()))?;
        engine.compile(source).or_raise(|| ErrorKind::Template)
    }

    /// Render one day folder's gallery page.
    pub fn day(&self, date: Date) -> Result<String> {
        let year = layout::year(date);
        self.day
            .render(&self.engine, upon::value! {
                title: layout::day(date),
                date: layout::day(date),
                year: &year,
                back: format!("../../{year}/index.html"),
            })
            .to_string()
            .or_raise(|| ErrorKind::Template)
    }

    /// Render a year's date-listing page.
    pub fn year(&self, year: &str) -> Result<String> {
        self.year
            .render(&self.engine, upon::value! { title: year })
            .to_string()
            .or_raise(|| ErrorKind::Template)
    }

    /// Render the site root page.
    pub fn root(&self) -> Result<String> {
        self.root
            .render(&self.engine, upon::value! { title: &self.site_title })
            .to_string()
            .or_raise(|| ErrorKind::Template)
    }
}
