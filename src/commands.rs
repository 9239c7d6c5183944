use futures::StreamExt;
use resdesk::config::Config;
use resdesk::docstore::FjallDocumentStore;
use resdesk::domain::{ImageSource, Resource, ResourceDraft};
use resdesk::imghost::ImageHostClient;
use resdesk::observability::Metrics;
use resdesk::publish::ResourcePublisher;
use resdesk::repository::{PageResult, ResourceRepository};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::{Commands, PageArgs, PublishArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trailer printed after a page so the next call can continue from it.
#[derive(Serialize)]
struct PageTrailer<'a> {
    next: Option<&'a str>,
    has_next: bool,
}

pub async fn run(command: Commands, config: Config) -> Result<(), AnyError> {
    let store =
        FjallDocumentStore::open_with_capacity(&config.store.path, config.store.listener_capacity)?;
    let metrics = Arc::new(Metrics::new());
    let repository = ResourceRepository::new(Arc::new(store.clone()))
        .with_collection(config.store.collection.clone())
        .with_metrics(metrics.clone());
    let page_size = |args: &PageArgs| args.page_size.unwrap_or(config.store.page_size);

    match command {
        Commands::Publish(args) => {
            let client = ImageHostClient::from_config(&config.image_host)?;
            let publisher = ResourcePublisher::new(Arc::new(client), repository);
            let resource = publisher.publish(&draft(args)).await?;
            store.persist()?;
            print_json(&resource)?;
        }
        Commands::List(page) => {
            let result = repository
                .get_page(page.after.as_deref(), page_size(&page))
                .await?;
            print_page(&result)?;
        }
        Commands::Search { prefix, page } => {
            let result = repository
                .search_page(&prefix, page.after.as_deref(), page_size(&page))
                .await?;
            print_page(&result)?;
        }
        Commands::Tag { tag, page } => {
            let result = repository
                .filter_by_tag_page(&tag, page.after.as_deref(), page_size(&page))
                .await?;
            print_page(&result)?;
        }
        Commands::Get { id } => match repository.get_by_id(&id).await? {
            Some(resource) => print_json(&resource)?,
            None => return Err(format!("Resource not found: {id}").into()),
        },
        Commands::Remove { ids } => {
            repository.remove_all(ids.iter().cloned()).await?;
            store.persist()?;
            info!(count = ids.len(), "Removed resources");
        }
        Commands::Watch => watch(&repository).await?,
    }

    debug!(metrics = ?metrics.snapshot(), "Command finished");
    Ok(())
}

fn draft(args: PublishArgs) -> ResourceDraft {
    let mut draft = ResourceDraft::new(args.title);
    draft.image = match (args.file, args.image_url) {
        (Some(path), _) => Some(ImageSource::File(path)),
        (None, Some(url)) => Some(ImageSource::Url(url)),
        (None, None) => None,
    };
    draft.kinds.extend(args.kinds);
    draft
}

async fn watch(repository: &ResourceRepository) -> Result<(), AnyError> {
    let mut updates = repository.watch_all().await?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Watching resources, press Ctrl+C to stop");
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            update = updates.next() => match update {
                Some(Ok(resources)) => print_json(&resources)?,
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AnyError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_page(page: &PageResult<Resource>) -> Result<(), AnyError> {
    for resource in &page.items {
        print_json(resource)?;
    }
    print_json(&PageTrailer {
        next: page.last_item_id.as_deref(),
        has_next: page.has_next,
    })
}
