use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use printease::config::{ClientConfig, ConfigError};
use printease::guard::Route;
use printease::net::api::HttpBackend;
use printease::net::types::{AccountKind, ApiError};
use printease::pages::auth::{AuthField, AuthForm, AuthMode, auth_page_redirect};
use printease::pages::dashboard::{Dashboard, DashboardOutcome, DashboardView};
use printease::pages::home;
use printease::state::session::{SessionError, SessionStore};
use printease::storage::{FileStorage, MemoryStorage, SessionStorage};

const MAX_REDIRECTS: usize = 3;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Session(#[from] SessionError),
    #[error("unknown route '{0}'")]
    UnknownRoute(String),
    #[error("too many redirects opening {0}")]
    RedirectLoop(Route),
    #[error("signed out here, but the saved session in {} could not be removed", .0.display())]
    SessionNotCleared(PathBuf),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "printease", about = "PrintEase document upload client")]
struct Cli {
    /// Backend origin; overrides PRINTEASE_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for the persisted session; overrides PRINTEASE_STATE_DIR.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Keep the session in memory only.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the landing page.
    Home,
    Login(LoginArgs),
    Register(RegisterArgs),
    Logout,
    Whoami {
        #[arg(long)]
        json: bool,
    },
    /// Open a page by path, following guard redirects.
    Open { path: String },
    /// List uploaded documents.
    Files {
        #[arg(long)]
        json: bool,
    },
    /// Upload a local PDF.
    Upload { path: PathBuf },
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "PRINTEASE_PASSWORD", hide_env_values = true)]
    password: String,
    /// Account type: `user` or `vendor`.
    #[arg(long = "as", default_value = "user")]
    kind: AccountKind,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[command(flatten)]
    login: LoginArgs,
    /// Defaults to the password.
    #[arg(long)]
    confirm_password: Option<String>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    organization: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // Ephemeral runs never touch the state directory.
    let state_dir = match cli.state_dir {
        Some(dir) => Some(dir),
        None if cli.ephemeral => Some(std::env::temp_dir().join("printease")),
        None => None,
    };
    let config = ClientConfig::from_env_with(cli.api_url.as_deref(), state_dir)?;

    let storage: Arc<dyn SessionStorage> = if cli.ephemeral {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(FileStorage::in_dir(&config.state_dir))
    };
    let backend = Arc::new(HttpBackend::new(&config)?);
    tracing::debug!(api_url = %backend.base_url(), "backend configured");

    let session = Arc::new(SessionStore::new(backend, Arc::clone(&storage)));
    session.check_auth().await;

    match cli.command {
        Command::Home => {
            println!("{}", home::PRODUCT_NAME);
            println!("next: {}", home::next_route(session.snapshot().phase()));
            Ok(())
        }
        Command::Login(args) => {
            let mut form = AuthForm::new(AuthMode::Login, args.kind);
            fill_credentials(&mut form, args);
            submit(&mut form, &session).await
        }
        Command::Register(args) => {
            let mut form = AuthForm::new(AuthMode::Register, args.login.kind);
            let confirm = args.confirm_password.unwrap_or_else(|| args.login.password.clone());
            fill_credentials(&mut form, args.login);
            form.set(AuthField::ConfirmPassword, confirm);
            form.set(AuthField::FullName, args.name);
            form.set(AuthField::OrganizationName, args.organization.unwrap_or_default());
            form.set(AuthField::Phone, args.phone.unwrap_or_default());
            submit(&mut form, &session).await
        }
        Command::Logout => {
            session.logout();
            if storage.load().is_ok_and(|stored| stored.complete().is_some()) {
                return Err(CliError::SessionNotCleared(config.state_dir));
            }
            println!("signed out");
            Ok(())
        }
        Command::Whoami { json } => {
            let identity = session.identity().ok_or(SessionError::NotAuthenticated)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                println!("{} <{}> ({})", identity.display_name, identity.email, identity.account_kind);
            }
            Ok(())
        }
        Command::Open { path } => {
            let route = Route::from_path(&path).ok_or(CliError::UnknownRoute(path))?;
            open_route(&session, route).await
        }
        Command::Files { json } => {
            let view = signed_in_dashboard(&session)?.refresh().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view.documents)?);
            } else {
                print_view(&view);
            }
            Ok(())
        }
        Command::Upload { path } => {
            let view = signed_in_dashboard(&session)?.upload(&path).await?;
            println!("uploaded {}", path.display());
            print_view(&view);
            Ok(())
        }
    }
}

fn fill_credentials(form: &mut AuthForm, args: LoginArgs) {
    form.set(AuthField::Email, args.email);
    form.set(AuthField::Password, args.password);
}

async fn submit(form: &mut AuthForm, session: &SessionStore) -> Result<(), CliError> {
    let route = form.submit(session).await?;
    if let Some(identity) = session.identity() {
        println!("signed in as {} ({})", identity.email, identity.account_kind);
    }
    println!("next: {route}");
    Ok(())
}

fn signed_in_dashboard(session: &Arc<SessionStore>) -> Result<Dashboard, CliError> {
    let identity = session.identity().ok_or(SessionError::NotAuthenticated)?;
    Ok(Dashboard::new(Arc::clone(session), identity.account_kind))
}

async fn open_route(session: &Arc<SessionStore>, requested: Route) -> Result<(), CliError> {
    let mut route = requested;
    for _ in 0..=MAX_REDIRECTS {
        let next = match route {
            Route::Home => {
                println!("{}", home::PRODUCT_NAME);
                None
            }
            Route::Auth => auth_page_redirect(session.snapshot().phase()),
            Route::UserDashboard | Route::VendorDashboard => {
                let kind = match route {
                    Route::VendorDashboard => AccountKind::Organization,
                    _ => AccountKind::Individual,
                };
                match Dashboard::new(Arc::clone(session), kind).open().await? {
                    DashboardOutcome::Ready(view) => {
                        print_view(&view);
                        None
                    }
                    DashboardOutcome::Redirect(target) => Some(target),
                }
            }
        };

        match next {
            Some(target) => {
                tracing::info!(from = %route, to = %target, "redirected");
                route = target;
            }
            None => {
                println!("at {route}");
                return Ok(());
            }
        }
    }
    Err(CliError::RedirectLoop(requested))
}

fn print_view(view: &DashboardView) {
    println!("{} | {}", view.heading, view.header_name);
    println!("{} files, {} bytes stored", view.total_uploads, view.bytes_stored);
    for doc in &view.documents {
        let size = doc.size.map_or_else(|| "-".to_owned(), |size| size.to_string());
        let status = doc.status.as_deref().unwrap_or("");
        println!("  {:<24} {:<40} {:>10} {}", doc.id, doc.file_name, size, status);
    }
}
