//! Minimal CLI parsing for offline feed rewriting.
//!
//! ```text
//! umlautarr [--catalog PATH] [--item EXTERNAL_ID --media-type TYPE] FEED...
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::media::MediaType;

pub const USAGE: &str =
    "usage: umlautarr [--catalog PATH] [--item EXTERNAL_ID --media-type TYPE] FEED...";

#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    /// Overrides `CATALOG_PATH`
    pub catalog: Option<PathBuf>,
    /// Match every feed item against this catalog item instead of the cache
    pub item: Option<(MediaType, String)>,
    pub feeds: Vec<PathBuf>,
    pub help: bool,
}

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(std::env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = CliOptions::default();
        let mut item_id = None;
        let mut media_type = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => options.help = true,
                "--catalog" => {
                    let value = args.next().context("--catalog needs a path")?;
                    options.catalog = Some(PathBuf::from(value));
                }
                "--item" => item_id = Some(args.next().context("--item needs an external id")?),
                "--media-type" => {
                    let value = args.next().context("--media-type needs a value")?;
                    media_type = Some(value.parse::<MediaType>()?);
                }
                _ if arg.starts_with("--catalog=") => {
                    if let Some((_, value)) = arg.split_once('=') {
                        options.catalog = Some(PathBuf::from(value));
                    }
                }
                _ if arg.starts_with("--") => bail!("Unknown option: {}", arg),
                _ => options.feeds.push(PathBuf::from(arg)),
            }
        }

        options.item = match (item_id, media_type) {
            (Some(id), Some(media_type)) => Some((media_type, id)),
            (Some(_), None) => return Err(anyhow!("--item requires --media-type")),
            (None, Some(_)) => return Err(anyhow!("--media-type requires --item")),
            (None, None) => None,
        };

        if options.feeds.is_empty() && !options.help {
            bail!("No feed files given\n{}", USAGE);
        }

        Ok(options)
    }
}
