use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    catalog::{filter_products, paginate_local},
    normalize, ApiClient, CartEvent, CartService, CollectionApi, HttpCartApi, HttpCollectionApi,
    MutationOutcome, Notification, NotificationSink, PageSnapshot, ResourceController, Severity,
    StoredCartCache,
};
use serde::Serialize;
use shared::{
    domain::{
        Category, CategoryDraft, Product, ProductDraft, RecordId, Resource, ResourceKind, User,
        UserDraft,
    },
    protocol::PageQuery,
};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

/// Upper bound on products pulled for local search.
const CATALOG_FETCH_LIMIT: u32 = 1000;

#[derive(Parser, Debug)]
#[command(about = "Storefront admin console")]
struct Cli {
    #[arg(long, default_value = "admin.toml")]
    config: PathBuf,
    #[arg(long)]
    api_base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        kind: KindArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    CreateUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
    },
    UpdateUser {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
    },
    CreateProduct {
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: Option<String>,
    },
    UpdateProduct {
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: Option<String>,
    },
    CreateCategory {
        #[arg(long)]
        name: String,
    },
    UpdateCategory {
        id: i64,
        #[arg(long)]
        name: String,
    },
    /// Deletes a record while viewing `page`, then shows the page that follows.
    Delete {
        kind: KindArg,
        id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Searches products by title or category.
    Search {
        term: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    #[command(subcommand)]
    Cart(CartCommand),
}

#[derive(Subcommand, Debug)]
enum CartCommand {
    Add {
        product_id: i64,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
    },
    SetQuantity {
        product_id: i64,
        quantity: u32,
    },
    Show,
    Clear,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KindArg {
    Users,
    Products,
    Categories,
}

/// Prints notifications the way the screens showed toasts.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => println!("{}", notification.message),
            Severity::Error => eprintln!("error: {}", notification.message),
        }
    }
}

struct App {
    settings: Settings,
    client: ApiClient,
    sink: Arc<dyn NotificationSink>,
}

impl App {
    fn new(settings: Settings) -> Result<Self> {
        let mut client = ApiClient::new(&settings.api_base_url, settings.request_timeout())
            .with_context(|| format!("cannot use api base url '{}'", settings.api_base_url))?;
        if let Some(token) = &settings.api_token {
            client = client.with_bearer_token(token.clone());
        }
        Ok(Self {
            settings,
            client,
            sink: Arc::new(ConsoleSink),
        })
    }

    fn collection(&self, kind: ResourceKind) -> Arc<HttpCollectionApi> {
        Arc::new(HttpCollectionApi::new(self.client.clone(), kind))
    }

    fn controller<R: Resource>(&self) -> Result<ResourceController<R>> {
        Ok(ResourceController::new(
            self.collection(R::KIND),
            self.sink.clone(),
            self.settings.page_size,
        )?)
    }

    /// Loads page 1 first so the page count is known, then moves to `page`.
    async fn open_page<R: Resource>(&self, page: u32) -> Result<ResourceController<R>> {
        let controller = self.controller::<R>()?;
        controller.request_page(1).await?;
        if page > 1 {
            controller.request_page(page).await?;
        }
        Ok(controller)
    }

    async fn cart(&self) -> Result<CartService> {
        let storage = Storage::new(&self.settings.cart_database_url)
            .await
            .with_context(|| {
                format!(
                    "failed to open cart store at '{}'",
                    self.settings.cart_database_url
                )
            })?;
        Ok(CartService::new(
            Arc::new(HttpCartApi::new(self.client.clone())),
            Arc::new(StoredCartCache::new(storage)),
        ))
    }
}

fn print_page<R: Resource + Serialize>(snapshot: &PageSnapshot<R>) -> Result<()> {
    for item in &snapshot.items {
        println!("{}", serde_json::to_string(item)?);
    }
    println!(
        "page {} of {} ({} {} total)",
        snapshot.current_page,
        snapshot.total_pages,
        snapshot.total_count,
        R::KIND.plural()
    );
    Ok(())
}

async fn list<R: Resource + Serialize>(app: &App, page: u32) -> Result<ExitCode> {
    let controller = app.open_page::<R>(page).await?;
    print_page(&controller.snapshot().await)?;
    Ok(ExitCode::SUCCESS)
}

async fn create<R: Resource + Serialize>(app: &App, draft: R::Draft) -> Result<ExitCode> {
    let controller = app.open_page::<R>(1).await?;
    finish_mutation(&controller, controller.create(draft).await).await
}

async fn update<R: Resource + Serialize>(app: &App, id: i64, draft: R::Draft) -> Result<ExitCode> {
    let controller = app.open_page::<R>(1).await?;
    let outcome = controller.update(Some(RecordId(id)), draft).await;
    finish_mutation(&controller, outcome).await
}

async fn delete<R: Resource + Serialize>(app: &App, id: i64, page: u32) -> Result<ExitCode> {
    let controller = app.open_page::<R>(page).await?;
    let outcome = controller.delete(Some(RecordId(id))).await;
    finish_mutation(&controller, outcome).await
}

async fn finish_mutation<R: Resource + Serialize>(
    controller: &ResourceController<R>,
    outcome: MutationOutcome,
) -> Result<ExitCode> {
    match outcome {
        MutationOutcome::Success => {
            print_page(&controller.snapshot().await)?;
            Ok(ExitCode::SUCCESS)
        }
        // Already reported through the sink.
        MutationOutcome::Failure(_) => Ok(ExitCode::FAILURE),
    }
}

async fn search(app: &App, term: &str, page: u32) -> Result<ExitCode> {
    let raw = app
        .collection(ResourceKind::Products)
        .list(PageQuery {
            page: 1,
            limit: CATALOG_FETCH_LIMIT,
        })
        .await
        .context("failed to fetch products")?;
    let products = normalize::<Product>(raw).items;

    let hits = filter_products(&products, term);
    let local = paginate_local(&hits, page, app.settings.page_size);
    for product in local.items {
        println!("{}", serde_json::to_string(product)?);
    }
    println!(
        "page {} of {} ({} matching products)",
        local.page, local.total_pages, local.total_count
    );
    Ok(ExitCode::SUCCESS)
}

async fn run_cart(app: &App, command: CartCommand) -> Result<ExitCode> {
    let cart = app.cart().await?;
    let mut events = cart.subscribe();

    match command {
        CartCommand::Add {
            product_id,
            quantity,
            title,
            price,
        } => {
            let product = Product {
                id: Some(RecordId(product_id)),
                title,
                price,
                category: String::new(),
                description: String::new(),
                image: None,
            };
            cart.add_to_cart(&product, quantity).await?;
        }
        CartCommand::SetQuantity {
            product_id,
            quantity,
        } => {
            cart.set_quantity(shared::domain::ProductId(product_id), quantity)
                .await?;
        }
        CartCommand::Clear => {
            cart.clear().await?;
        }
        CartCommand::Show => {
            let lines = cart.lines().await?;
            let mut total = 0.0;
            for line in &lines {
                total += line.subtotal();
                println!(
                    "{:>6}  {:<32} x{:<4} {:>10.2}",
                    line.product_id.0,
                    line.title,
                    line.quantity,
                    line.subtotal()
                );
            }
            println!(
                "{} item(s), total {:.2}",
                client_core::cart::item_count(&lines),
                total
            );
        }
    }

    if let Ok(CartEvent::Changed { item_count }) = events.try_recv() {
        println!("cart now holds {item_count} item(s)");
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config);
    if let Some(url) = cli.api_base_url {
        settings.api_base_url = url;
    }
    info!(api_base_url = %settings.api_base_url, page_size = settings.page_size, "admin console starting");
    let app = App::new(settings)?;

    match cli.command {
        Command::List { kind, page } => match kind {
            KindArg::Users => list::<User>(&app, page).await,
            KindArg::Products => list::<Product>(&app, page).await,
            KindArg::Categories => list::<Category>(&app, page).await,
        },
        Command::CreateUser { name, email, role } => {
            create::<User>(&app, UserDraft { name, email, role }).await
        }
        Command::UpdateUser {
            id,
            name,
            email,
            role,
        } => update::<User>(&app, id, UserDraft { name, email, role }).await,
        Command::CreateProduct {
            title,
            price,
            category,
            description,
            image,
        } => {
            let draft = ProductDraft {
                title,
                price,
                category,
                description,
                image,
            };
            create::<Product>(&app, draft).await
        }
        Command::UpdateProduct {
            id,
            title,
            price,
            category,
            description,
            image,
        } => {
            let draft = ProductDraft {
                title,
                price,
                category,
                description,
                image,
            };
            update::<Product>(&app, id, draft).await
        }
        Command::CreateCategory { name } => create::<Category>(&app, CategoryDraft { name }).await,
        Command::UpdateCategory { id, name } => {
            update::<Category>(&app, id, CategoryDraft { name }).await
        }
        Command::Delete { kind, id, page } => match kind {
            KindArg::Users => delete::<User>(&app, id, page).await,
            KindArg::Products => delete::<Product>(&app, id, page).await,
            KindArg::Categories => delete::<Category>(&app, id, page).await,
        },
        Command::Search { term, page } => search(&app, &term, page).await,
        Command::Cart(command) => run_cart(&app, command).await,
    }
}
