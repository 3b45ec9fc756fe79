//! Subcommands and their execution.
//!
//! `Context` is the composition root: it builds the single
//! `SessionCoordinator` and hands the API client and access gate to the
//! commands that need them.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use zapata_core::api::{ApiClient, ApiError};
use zapata_core::auth::{token, Access, AccessGate, GateDecision, SessionCoordinator};
use zapata_core::config::{Config, StorageKind};
use zapata_core::models::{
    rebar, BarSlot, CalculationRequest, Footing, LoginRequest, Rebar, RegisterRequest, REBARS,
};
use zapata_core::utils::{format_number, resolve_input, truncate_string};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in (password is prompted)
    Login {
        /// Account email; defaults to the last one used
        email: Option<String>,
    },

    /// Create an account and log in
    Register {
        /// Display name
        name: String,
        /// Account email
        email: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the current session and whether the server is reachable
    Status,

    /// Print the default parameters for a footing
    Defaults {
        /// combined, isolated, corner or tie-beam
        #[arg(value_parser = parse_footing)]
        footing: Footing,
    },

    /// Run a calculation
    #[command(alias = "c")]
    Calc {
        /// combined, isolated, corner or tie-beam
        #[arg(value_parser = parse_footing)]
        footing: Footing,
        /// Parameter overrides as KEY=VALUE; values accept arithmetic (Pd=400+20)
        #[arg(value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, f64)>,
        /// Rebar selection for the tie-beam form, e.g. Nbarras=5/8
        #[arg(long = "bar", value_name = "FIELD=SIZE", value_parser = parse_bar)]
        bars: Vec<(BarSlot, Rebar)>,
    },
}

fn parse_footing(s: &str) -> Result<Footing, String> {
    s.parse()
}

pub fn parse_storage(s: &str) -> Result<StorageKind, String> {
    s.parse::<StorageKind>().map_err(|e| e.to_string())
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", s));
    }
    let value = resolve_input(raw).ok_or_else(|| format!("invalid value for {}: '{}'", key, raw.trim()))?;
    Ok((key.to_string(), value))
}

fn parse_bar(s: &str) -> Result<(BarSlot, Rebar), String> {
    let (field, size) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=SIZE, got '{}'", s))?;
    let slot: BarSlot = field.parse()?;
    let bar = rebar(size).ok_or_else(|| {
        let sizes: Vec<&str> = REBARS.iter().map(|r| r.designation).collect();
        format!("unknown bar size '{}' (expected one of: {})", size.trim(), sizes.join(", "))
    })?;
    Ok((slot, bar))
}

/// Apply command-line overrides on top of the footing's form defaults.
pub fn build_request(
    footing: Footing,
    params: &[(String, f64)],
    bars: &[(BarSlot, Rebar)],
) -> Result<CalculationRequest> {
    if !bars.is_empty() && !footing.uses_bars() {
        bail!("{} takes no bar selections", footing.display_name());
    }
    let mut request = CalculationRequest::with_defaults(footing);
    for (key, value) in params {
        if !request.params.contains_key(key) {
            warn!(key = %key, footing = %footing, "Parameter not used by this footing's form");
        }
        request.params.insert(key.clone(), *value);
    }
    for (slot, bar) in bars {
        request.bars.insert(*slot, *bar);
    }
    Ok(request)
}

pub struct Context {
    config: Config,
    api: Arc<ApiClient>,
    session: Arc<SessionCoordinator>,
    gate: AccessGate,
    sweep: Option<JoinHandle<()>>,
}

impl Context {
    pub fn new(api_url: Option<String>, storage: Option<StorageKind>) -> Result<Self> {
        let mut config = Config::load()?;
        config.apply_overrides(api_url, storage);
        let store = config.token_store()?;
        let api = Arc::new(
            ApiClient::new(config.api_base_url(), store.clone())
                .context("Failed to create HTTP client")?,
        );
        let session = SessionCoordinator::new(api.clone(), store);
        let gate = AccessGate::new(session.clone());

        Ok(Self {
            config,
            api,
            session,
            gate,
            sweep: None,
        })
    }

    /// Bootstrap the session and wait for the server to confirm or reject
    /// a stored token.
    async fn start_session(&mut self) {
        if let Some(verification) = self.session.bootstrap() {
            if let Err(e) = verification.await {
                warn!(error = %e, "Token verification task failed");
            }
        }
        self.sweep = Some(
            self.session
                .spawn_expiry_sweep(self.config.expiry_check_interval()),
        );
    }

    pub fn shutdown(&mut self) {
        if let Some(sweep) = self.sweep.take() {
            sweep.abort();
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        if let Command::Defaults { footing } = command {
            print_defaults(footing);
            return Ok(());
        }

        self.start_session().await;

        match command {
            Command::Login { email } => self.login(email).await,
            Command::Register { name, email } => self.register(name, email).await,
            Command::Logout => {
                self.session.logout();
                println!("Logged out.");
                Ok(())
            }
            Command::Status => {
                self.print_status().await;
                Ok(())
            }
            Command::Calc {
                footing,
                params,
                bars,
            } => self.calculate(footing, &params, &bars).await,
            Command::Defaults { .. } => Ok(()),
        }
    }

    fn ensure_guest(&self) -> bool {
        if self.gate.check(Access::GuestOnly) == GateDecision::Deny {
            let name = self
                .session
                .current_user()
                .map(|u| u.display_name().to_string())
                .unwrap_or_default();
            println!("Already logged in as {}. Run `zapata logout` first.", name);
            return false;
        }
        true
    }

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        if !self.ensure_guest() {
            return Ok(());
        }
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        println!("\nAuthenticating...");
        let user = self
            .session
            .login(&LoginRequest::new(email.clone(), password))
            .await
            .map_err(|e| anyhow::anyhow!("Login failed: {}", e.user_message()))?;

        self.remember_email(email);
        println!("Login successful! Welcome, {}.", user.display_name());
        Ok(())
    }

    async fn register(&mut self, name: String, email: String) -> Result<()> {
        if !self.ensure_guest() {
            return Ok(());
        }
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let request = RegisterRequest {
            name,
            email: email.clone(),
            password,
            confirm_password: Some(confirm),
        };
        let user = self
            .session
            .register(&request)
            .await
            .map_err(|e| anyhow::anyhow!("Registration failed: {}", e.user_message()))?;

        self.remember_email(email);
        println!("Account created. Welcome, {}.", user.display_name());
        Ok(())
    }

    fn remember_email(&mut self, email: String) {
        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    async fn print_status(&self) {
        let snapshot = self.session.snapshot();
        let reachable = if self.api.health().await { "reachable" } else { "unreachable" };
        println!("Server:  {} ({})", self.api.base_url(), reachable);
        println!("Session: {:?}", snapshot.phase);
        match snapshot.state.user() {
            Some(user) => println!("User:    {} <{}> (id {})", user.display_name(), user.email, user.id),
            None => println!("User:    not logged in"),
        }
        if let Some(claims) = snapshot.state.token().and_then(|t| token::decode(t).ok()) {
            if let Some(expires) = DateTime::<Utc>::from_timestamp(claims.exp, 0) {
                let minutes = (expires - Utc::now()).num_minutes().max(0);
                println!("Expires: {} ({} min left)", expires.format("%Y-%m-%d %H:%M UTC"), minutes);
            }
        }
    }

    async fn calculate(
        &mut self,
        footing: Footing,
        params: &[(String, f64)],
        bars: &[(BarSlot, Rebar)],
    ) -> Result<()> {
        let request = build_request(footing, params, bars)?;
        if self.gate.resolve(Access::RequireAuth).await != GateDecision::Allow {
            bail!("Not logged in. Run `zapata login` first.");
        }
        debug!(footing = %footing, params = ?request.params, "Submitting calculation");

        println!("{}...", footing.display_name());
        let result = match self.api.calculate(&request).await {
            Ok(result) => result,
            Err(ApiError::Unauthorized(_)) => {
                self.session.logout();
                bail!("Session expired. Run `zapata login` again.");
            }
            Err(ApiError::Calculation { message, details }) => match details {
                Some(details) => {
                    bail!("Calculation error: {} ({})", message, truncate_string(&details, 200))
                }
                None => bail!("Calculation error: {}", message),
            },
            Err(e) => bail!("{}", e.user_message()),
        };

        println!("{}", serde_json::to_string_pretty(&result.response)?);
        if let Some(chart) = &result.response_chart {
            println!("\nChart data:\n{}", serde_json::to_string_pretty(chart)?);
        }
        Ok(())
    }
}

fn print_defaults(footing: Footing) {
    println!("{} ({})", footing.display_name(), footing.endpoint());
    for (key, value) in footing.default_params() {
        println!("  {:<14} = {}", key, format_number(value));
    }
    for (slot, bar) in footing.default_bars() {
        println!("  {:<14} = {}\" ({} cm²)", slot.key(), bar.designation, format_number(bar.area_cm2));
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("No input given");
    }
    Ok(value)
}
