use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use resdesk::domain::ResourceKind;
use resdesk::repository::MAX_PAGE_SIZE;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resdesk")]
#[command(about = "Manage the hosted resource catalogue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload an image and store it as a new resource
    Publish(PublishArgs),
    /// List resources, newest first
    List(PageArgs),
    /// Search resources by title prefix
    Search {
        prefix: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// List resources carrying a tag, newest first
    Tag {
        tag: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Print one resource
    Get { id: String },
    /// Delete resources in one batch
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print the full list on every change until Ctrl+C
    Watch,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[arg(long)]
    pub title: String,

    /// Resource kind; repeat for several (flag, tourist)
    #[arg(long = "kind", value_parser = parse_kind)]
    pub kinds: Vec<ResourceKind>,

    /// Local image file
    #[arg(long, conflicts_with = "image_url", required_unless_present = "image_url")]
    pub file: Option<PathBuf>,

    /// Remote image the host should fetch
    #[arg(long)]
    pub image_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// Defaults to store.page_size
    #[arg(long, value_parser = page_size_parser())]
    pub page_size: Option<usize>,

    /// Id of the last resource of the previous page
    #[arg(long)]
    pub after: Option<String>,
}

fn page_size_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..=MAX_PAGE_SIZE as u64)
}

fn parse_kind(value: &str) -> Result<ResourceKind, String> {
    ResourceKind::from_tag(value).ok_or_else(|| {
        let known: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.tag()).collect();
        format!("unknown kind '{}', expected one of: {}", value, known.join(", "))
    })
}
