//! Berean CLI - drives the client session core from a terminal.
//!
//! Useful for poking the backend during development: sign in, inspect the
//! session, exercise the push endpoints and watch a pending checkout
//! settle. See the `berean` library for the core functionality.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use berean::api::{HttpAccountApi, HttpBillingApi, HttpNotificationApi};
use berean::{
    capability, CheckoutOutcome, Config, CredentialStore, EntitlementPoller, PushManager,
    SessionManager, UnsupportedPlatform,
};

#[derive(Parser)]
#[command(name = "berean", about = "Berean session and entitlement tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password.
    Login {
        /// Account email.
        email: String,
    },
    /// Create an account and sign in.
    Register {
        /// Display name.
        name: String,
        /// Account email.
        email: String,
    },
    /// Sign out and erase the stored credential.
    Logout,
    /// Show the current session and capability tier.
    Status,
    /// Push subscription operations.
    Push {
        #[command(subcommand)]
        action: PushAction,
    },
    /// Poll a pending checkout session until it settles.
    Upgrade {
        /// Checkout session id from the post-checkout landing URL.
        session_id: String,
    },
}

#[derive(Subcommand)]
enum PushAction {
    /// Show local push state and the service-side subscription flag.
    Status,
    /// Subscribe this device.
    Subscribe,
    /// Remove the subscription.
    Unsubscribe,
    /// Ask the service for a test notification.
    Test,
}

struct Core {
    session: Arc<SessionManager>,
    push: PushManager,
    poller: EntitlementPoller,
}

fn build_core(config: &Config) -> Result<Core> {
    let base = config.api_base();
    let store = CredentialStore::open()?;
    let session = Arc::new(SessionManager::new(
        Arc::new(HttpAccountApi::new(&base)),
        store,
    ));
    let push = PushManager::new(
        // A terminal has no notification permission surface; push commands
        // exercise the unsupported path against the real endpoints.
        Arc::new(UnsupportedPlatform),
        Arc::new(HttpNotificationApi::new(&base)),
        Arc::clone(&session),
    );
    let poller = EntitlementPoller::new(
        Arc::new(HttpBillingApi::new(&base)),
        Arc::clone(&session),
    )
    .with_schedule(
        std::time::Duration::from_secs(config.checkout_poll_interval),
        config.checkout_poll_attempts,
    );
    Ok(Core {
        session,
        push,
        poller,
    })
}

/// Prompt for a password on stdin.
fn read_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("Failed to read password")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    let core = build_core(&config)?;

    // Reconstruct the session from the stored credential before anything
    // that needs it.
    core.session.hydrate().await;

    match cli.command {
        Command::Login { email } => {
            let password = read_password()?;
            let response = core.session.login(&email, &password).await?;
            println!("Signed in as {} <{}>", response.user.name, response.user.email);
        }
        Command::Register { name, email } => {
            let password = read_password()?;
            let response = core.session.register(&name, &email, &password).await?;
            println!("Welcome, {}! Signed in as {}", response.user.name, response.user.email);
        }
        Command::Logout => {
            core.session.logout().await;
            println!("Signed out.");
        }
        Command::Status => {
            let session = core.session.session();
            match &session.user {
                Some(user) => {
                    println!("Signed in:  {} <{}>", user.name, user.email);
                    println!("Capability: {}", capability(&session));
                }
                None => println!("Not signed in."),
            }
        }
        Command::Push { action } => run_push(&core, action).await?,
        Command::Upgrade { session_id } => {
            // Cancelable from the keyboard, like navigating away mid-poll
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.cancel();
                }
            });

            println!("Waiting for payment confirmation (ctrl-c to stop)...");
            match core.poller.poll(&session_id, &cancel).await? {
                CheckoutOutcome::Confirmed => println!("Welcome to Premium!"),
                CheckoutOutcome::Expired => {
                    println!("Payment session expired. Please try again.");
                }
                CheckoutOutcome::TimedOut => {
                    println!("Payment verification timed out. Check your email for confirmation.");
                }
                CheckoutOutcome::Canceled => println!("Stopped."),
            }
        }
    }

    Ok(())
}

async fn run_push(core: &Core, action: PushAction) -> Result<()> {
    match action {
        PushAction::Status => {
            let state = core.push.state();
            println!("Supported:  {}", state.supported);
            println!("Permission: {}", state.permission);
            core.push.refresh_status().await?;
            println!("Subscribed: {}", core.push.state().subscribed);
        }
        PushAction::Subscribe => {
            core.push.subscribe().await?;
            println!("Subscribed to notifications.");
        }
        PushAction::Unsubscribe => {
            core.push.unsubscribe().await?;
            println!("Unsubscribed from notifications.");
        }
        PushAction::Test => {
            core.push.send_test().await?;
            println!("Test notification requested.");
        }
    }
    Ok(())
}
