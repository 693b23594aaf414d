//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::source::{Source, SourceKind};

#[derive(Debug, Parser)]
#[command(name = "feedmux", version, about)]
pub struct Args {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log file, overriding the configured one.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level, overriding the configured one.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Add an active Dribbble search source.
    #[arg(long, value_name = "QUERY")]
    pub dribbble: Vec<String>,

    /// Add an active Designer News search source.
    #[arg(long = "dn-search", value_name = "QUERY")]
    pub dn_search: Vec<String>,

    /// Add an active paged RSS source.
    #[arg(long, value_name = "URL")]
    pub rss: Vec<String>,
}

impl Args {
    /// Sources requested on the command line, all active.
    pub fn extra_sources(&self) -> Vec<Source> {
        let dribbble = self.dribbble.iter().map(|query| SourceKind::DribbbleSearch {
            query: query.trim().to_string(),
        });
        let dn = self.dn_search.iter().map(|query| SourceKind::DesignerNewsSearch {
            query: query.trim().to_string(),
        });
        let rss = self.rss.iter().map(|url| SourceKind::Rss {
            url: url.trim().to_string(),
        });
        dribbble
            .chain(dn)
            .chain(rss)
            .map(|kind| Source::from_kind(kind, true))
            .collect()
    }
}
