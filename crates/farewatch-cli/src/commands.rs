//! Command parsing and execution.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use farewatch_core::alerts::{AlertThreshold, PriceAlertTrigger};
use farewatch_core::api::ApiClient;
use farewatch_core::auth::{EncryptedFileStore, KeyringStore, SecureStore, SessionManager};
use farewatch_core::config::{Config, CredentialBackend};
use farewatch_core::models::{
    AlertCreate, Flight, FlightSearchRequest, PricePredictionRequest,
};
use farewatch_core::notifications::Notifier;
use farewatch_core::utils::{format_price, format_route, format_stops, format_timestamp, truncate_string};
use tracing::{debug, warn};

use crate::notifier::TerminalNotifier;

/// Password source for non-interactive use
const PASSWORD_ENV: &str = "FAREWATCH_PASSWORD";

/// Passphrase for the encrypted credential file
const STORE_PASSPHRASE_ENV: &str = "FAREWATCH_STORE_PASSPHRASE";

const CREDENTIAL_FILE: &str = "credentials.json";

/// Width of the airline column in result tables
const AIRLINE_COLUMN_WIDTH: usize = 14;

/// Flight price alerts from the terminal
#[derive(Debug, Parser)]
#[command(name = "farewatch", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Sign in
    Login { email: Option<String> },
    /// Create an account and sign in
    Register { email: Option<String> },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Search flights; notify when a fare beats --target
    Search {
        /// Origin airport (IATA code)
        origin: String,
        /// Destination airport (IATA code)
        destination: String,
        /// Departure date, DD-MM-YYYY
        departure: String,
        /// Return date for a round trip, DD-MM-YYYY
        #[arg(long = "return", value_name = "DD-MM-YYYY")]
        return_date: Option<String>,
        /// Notify when the cheapest fare is below this price
        #[arg(long, value_name = "PRICE")]
        target: Option<String>,
    },
    /// Manage price alerts (lists them by default)
    Alerts {
        #[command(subcommand)]
        action: Option<AlertAction>,
    },
    /// Show recent searches
    History,
    /// Predict the fare trend for a route
    Predict {
        origin: String,
        destination: String,
        /// Days from today
        days: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum AlertAction {
    /// List price alerts
    List,
    /// Create a price alert
    Add {
        origin: String,
        destination: String,
        price: String,
    },
    /// Delete a price alert
    Rm { id: i64 },
    /// Ask the backend for a test notification
    Test { id: i64 },
}

/// Everything a command needs, wired the way the app wires it at start.
pub struct App {
    config: Config,
    api: ApiClient,
    session: SessionManager,
    notifier: Notifier,
    trigger: PriceAlertTrigger,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let store = open_store(&config)?;
        let session = SessionManager::start(store, Arc::new(api.clone())).await;
        let notifier = Notifier::new(Arc::new(TerminalNotifier::from_env()));
        let trigger = PriceAlertTrigger::new(notifier.clone());
        debug!(base_url = api.base_url(), state = ?session.session().state(), "App ready");

        Ok(Self {
            config,
            api,
            session,
            notifier,
            trigger,
        })
    }

    pub async fn run(mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email } => {
                let email = self.resolve_email(email)?;
                let password = read_password()?;
                self.session.try_login(&email, &password).await.context("Login failed")?;
                self.remember_email(&email);
                println!("Signed in as {}", email);
            }
            Command::Register { email } => {
                let email = self.resolve_email(email)?;
                let password = read_password()?;
                self.session
                    .try_register(&email, &password)
                    .await
                    .context("Registration failed")?;
                self.remember_email(&email);
                println!("Account created, signed in as {}", email);
            }
            Command::Logout => {
                self.session.logout().await;
                self.notifier.cancel_all().await;
                println!("Signed out");
            }
            Command::Whoami => match self.session.session().user() {
                Some(user) => println!("{} (id {})", user.email, user.id),
                None => println!("Not signed in"),
            },
            Command::Search {
                origin,
                destination,
                departure,
                return_date,
                target,
            } => {
                self.require_session()?;
                let request =
                    FlightSearchRequest::from_input(&origin, &destination, &departure, return_date.as_deref())?;
                let response = self.api.search_flights(&request).await?;
                print_flights(&request, &response.flights);

                if let Some(raw) = target {
                    match AlertThreshold::from_input(&request.origin, &request.destination, &raw) {
                        Some(threshold) => {
                            self.trigger.on_search_completed(&response.flights, &threshold).await;
                        }
                        None => debug!(input = %raw, "Ignoring invalid target price"),
                    }
                }
            }
            Command::Alerts { action: None | Some(AlertAction::List) } => {
                self.require_session()?;
                let alerts = self.api.list_alerts().await?;
                if alerts.is_empty() {
                    println!("No price alerts");
                }
                for alert in alerts {
                    let status = if alert.is_active { "active" } else { "paused" };
                    println!(
                        "#{:<4} {:<12} {:>12}  {:<7} created {}",
                        alert.id,
                        format_route(&alert.origin, &alert.destination),
                        format_price(alert.target_price),
                        status,
                        format_timestamp(&alert.created_at)
                    );
                }
            }
            Command::Alerts {
                action:
                    Some(AlertAction::Add {
                        origin,
                        destination,
                        price,
                    }),
            } => {
                self.require_session()?;
                let alert = AlertCreate::from_input(&origin, &destination, &price)?;
                let created = self.api.create_alert(&alert).await?;
                println!(
                    "Alert #{} created: {} below {}",
                    created.id,
                    format_route(&created.origin, &created.destination),
                    format_price(created.target_price)
                );
            }
            Command::Alerts { action: Some(AlertAction::Rm { id }) } => {
                self.require_session()?;
                self.api.delete_alert(id).await?;
                println!("Alert #{} deleted", id);
            }
            Command::Alerts { action: Some(AlertAction::Test { id }) } => {
                self.require_session()?;
                let result = self.api.test_alert_notification(id).await?;
                println!("{}", result.message);
            }
            Command::History => {
                self.require_session()?;
                let history = self.api.search_history().await?;
                if history.is_empty() {
                    println!("No searches yet");
                }
                for entry in history {
                    println!(
                        "{}  {:<12} departing {}  {} results",
                        format_timestamp(&entry.search_date),
                        format_route(&entry.origin, &entry.destination),
                        entry.departure_date,
                        entry.results_count
                    );
                }
            }
            Command::Predict {
                origin,
                destination,
                days,
            } => {
                self.require_session()?;
                let request = PricePredictionRequest {
                    origin: origin.to_ascii_uppercase(),
                    destination: destination.to_ascii_uppercase(),
                    days_ahead: days,
                };
                let prediction = self.api.predict_price(&request).await?;
                println!(
                    "{} in {} days: {} (trend {})",
                    format_route(&request.origin, &request.destination),
                    days,
                    format_price(prediction.predicted_price),
                    prediction.trend
                );
            }
        }
        Ok(())
    }

    fn require_session(&self) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            bail!("Not signed in. Run `farewatch login` first.")
        }
    }

    fn resolve_email(&self, email: Option<String>) -> Result<String> {
        if let Some(email) = email {
            return Ok(email);
        }
        if let Some(ref last) = self.config.last_email {
            let answer = prompt(&format!("Email [{}]: ", last))?;
            return Ok(if answer.is_empty() { last.clone() } else { answer });
        }
        let email = prompt("Email: ")?;
        if email.is_empty() {
            bail!("Email is required");
        }
        Ok(email)
    }

    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn SecureStore>> {
    match config.credential_backend {
        CredentialBackend::Keyring => Ok(Arc::new(KeyringStore)),
        CredentialBackend::EncryptedFile => {
            let passphrase = match std::env::var(STORE_PASSPHRASE_ENV) {
                Ok(passphrase) => passphrase,
                Err(_) => rpassword::prompt_password("Credential file passphrase: ")
                    .context("Failed to read credential file passphrase")?,
            };
            let path = config.data_dir()?.join(CREDENTIAL_FILE);
            let store = EncryptedFileStore::open(path, &passphrase)
                .context("Failed to open encrypted credential file")?;
            debug!(path = %store.path().display(), "Using encrypted credential file");
            Ok(Arc::new(store))
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn print_flights(request: &FlightSearchRequest, flights: &[Flight]) {
    let mut trip = format!(
        "{} on {}",
        format_route(&request.origin, &request.destination),
        request.departure_date.format("%d-%m-%Y")
    );
    if let Some(return_date) = request.return_date {
        trip.push_str(&format!(", back {}", return_date.format("%d-%m-%Y")));
    }
    println!("{}", trip);

    if flights.is_empty() {
        println!("No flights found.");
        return;
    }

    let mut sorted: Vec<&Flight> = flights.iter().collect();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
    for flight in sorted {
        println!(
            "  {:<width$} {:<8} {} → {}  {:<8} {:<8} {:>12}",
            truncate_string(&flight.airline, AIRLINE_COLUMN_WIDTH),
            flight.flight_number,
            flight.departure_time,
            flight.arrival_time,
            flight.duration,
            format_stops(flight.stops),
            format_price(flight.price),
            width = AIRLINE_COLUMN_WIDTH,
        );
    }
}
