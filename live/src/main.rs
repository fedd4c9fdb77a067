use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use domain::collection::{Identified, Searchable, SharedCollection};
use domain::gate::{AccessGate, Decision};
use domain::notification::Notification;
use domain::pagination::{PageView, ITEMS_PER_PAGE};
use domain::reconciler::{Invalidate, Refetch, RefetchWorker, ViewReconciler};
use domain::session::{CredentialStore, MemoryCredentialStore, SESSION_TTL};
use domain::user::UserDetails;
use live::api_client::{ApiClient, NotificationsSource, UsersSource};
use live::feeds::{bind_notifications, bind_users};
use live::{EventSourceTransport, LiveChannel, PageSubscriptions};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "portal-watch")]
#[command(about = "Follow a live portal table from the terminal")]
struct Cli {
    /// Base URL of the portal server (e.g., http://localhost:4000)
    #[arg(long, env = "PORTAL_BASE_URL", default_value = "http://localhost:4000")]
    base_url: String,

    /// Base URL of the upstream API used for authoritative refetches
    #[arg(long, env = "PORTAL_API_URL")]
    api_url: String,

    /// Session token issued by the upstream sign-in
    #[arg(long, env = "PORTAL_TOKEN")]
    token: String,

    /// Role tag of the session (SUPER_ADMIN, ADMIN or USER)
    #[arg(long, env = "PORTAL_ROLE", default_value = "ADMIN")]
    role: String,

    /// Table to follow
    #[arg(long, value_enum, default_value_t = ViewChoice::Users)]
    view: ViewChoice,

    /// Case-insensitive search applied to the table
    #[arg(long, default_value = "")]
    search: String,

    /// Page to show (clamped to the last page)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// User id whose read state is shown in the notifications table
    #[arg(long)]
    user_id: Option<String>,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum ViewChoice {
    /// Registered users, as on the admin dashboard
    Users,
    /// Announcements with per-user read state
    Notifications,
}

impl ViewChoice {
    fn page_path(&self) -> &'static str {
        match self {
            ViewChoice::Users => "/admin/dashboard",
            ViewChoice::Notifications => "/announcements",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Warn)
            .init();
    }

    println!("{}", "=== SESSION ===".bright_white().bold());
    let store = MemoryCredentialStore::new();
    store.set(&cli.token, &cli.role, SESSION_TTL)?;
    let session = store.get();

    if let Decision::Redirect(location) = AccessGate::default().evaluate(&session, cli.view.page_path())
    {
        bail!(
            "a {} session may not open {} (it would be sent to {location})",
            cli.role,
            cli.view.page_path()
        );
    }
    println!("{} Signed in as {}", "✓".green(), cli.role);

    let channel = LiveChannel::new(EventSourceTransport::new(&cli.base_url, &session)?);
    let api = ApiClient::new(reqwest::Client::new(), &cli.api_url, &cli.token);
    let mut view = PageView::new(ITEMS_PER_PAGE);
    view.set_search(cli.search.clone());
    view.go_to(cli.page);

    let mut page = PageSubscriptions::new(cli.view.page_path());
    println!("\n{}", "=== LIVE ===".bright_white().bold());

    match cli.view {
        ViewChoice::Users => {
            let users = SharedCollection::<UserDetails>::default();
            let (reconciler, commands) = ViewReconciler::new(users.clone());
            bind_users(&channel, reconciler, &mut page);
            watch(users, Arc::new(UsersSource(api)), commands, view, user_row).await?;
        }
        ViewChoice::Notifications => {
            let notifications = SharedCollection::<Notification>::default();
            let (reconciler, commands) = ViewReconciler::new(notifications.clone());
            bind_notifications(&channel, reconciler, &mut page);
            let reader = cli.user_id.clone();
            watch(
                notifications,
                Arc::new(NotificationsSource(api)),
                commands,
                view,
                move |row, notification| notification_row(row, notification, reader.as_deref()),
            )
            .await?;
        }
    }

    page.release_all();
    println!("{} Stopped", "→".blue());
    Ok(())
}

/// Loads the collection once, then reprints the current page on every change
/// until interrupted.
async fn watch<T, R>(
    collection: SharedCollection<T>,
    source: Arc<R>,
    commands: mpsc::UnboundedReceiver<Invalidate>,
    mut view: PageView,
    render_row: impl Fn(usize, &T) -> String,
) -> Result<()>
where
    T: Identified + Searchable + Send + Sync + 'static,
    R: Refetch<T> + 'static,
{
    let worker = RefetchWorker::new(collection.clone(), source, commands);
    let loaded = worker.refresh().await?;
    println!("{} Loaded {loaded} entries", "✓".green());

    let mut changes = collection.changes();
    print_page(&collection, &mut view, &render_row);
    let worker = worker.spawn();

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                print_page(&collection, &mut view, &render_row);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    worker.abort();
    Ok(())
}

fn print_page<T: Identified + Searchable>(
    collection: &SharedCollection<T>,
    view: &mut PageView,
    render_row: &impl Fn(usize, &T) -> String,
) {
    collection.read(|items| {
        view.clamp_page(items);
        let page = view.render(items);

        println!(
            "\n{} page {}/{} ({} match{})",
            "■".cyan(),
            page.current_page,
            page.total_pages.max(1),
            page.total_matches,
            if page.total_matches == 1 { "" } else { "es" }
        );
        if page.rows.is_empty() {
            println!("  {}", "no data".dimmed());
        }
        for (row, item) in page.rows {
            println!("{}", render_row(row, item));
        }
    });
}

fn user_row(row: usize, user: &UserDetails) -> String {
    let status = if user.is_blocked() {
        user.status.to_string().red()
    } else {
        user.status.to_string().green()
    };
    format!(
        "{row:>4}. {:<28} {:<32} {:<10} {:>3} sequences",
        user.full_name(),
        user.email,
        status,
        user.sequences.len()
    )
}

fn notification_row(row: usize, notification: &Notification, reader: Option<&str>) -> String {
    let marker = match reader {
        Some(user_id) if notification.is_read_by(user_id) => "  ".normal(),
        Some(_) => "● ".yellow(),
        None => "  ".normal(),
    };
    let created = notification
        .created_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!("{row:>4}. {marker}{:<40} {created}", notification.title)
}
