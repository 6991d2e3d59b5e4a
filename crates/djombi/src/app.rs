//! Command execution.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, bail};
use djombi_auth::{
    AuthorizedClient, CookieJar, LinkedEmailAccount, Organization, ProfileService, ReqwestTransport,
    SelectedEmailAccount, SessionContext,
};
use djombi_core::{
    CategoryController, Email, EmailApi, EmailStore, OutgoingEmail, ServiceConfig, SyncOutcome,
};
use tracing::info;

use crate::cli::{AccountsAction, Command, DraftsAction, OrgAction};

/// Wired services for one invocation.
pub struct App {
    session: SessionContext,
    profile: Arc<ProfileService<ReqwestTransport>>,
    controller: CategoryController<ReqwestTransport>,
}

impl App {
    /// Loads the configuration and opens the cookie jar.
    pub fn open(cookies: Option<&Path>) -> anyhow::Result<Self> {
        let config = ServiceConfig::load().context("Failed to load configuration")?;
        let auth_url = config.auth_url()?;

        let jar_path = cookies.map_or_else(default_jar_path, Path::to_path_buf);
        let jar = CookieJar::persistent(&jar_path, auth_url.scheme() == "https")
            .with_context(|| format!("Failed to open cookie jar {}", jar_path.display()))?;
        let session = SessionContext::new(Arc::new(jar));

        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        let profile = Arc::new(
            ProfileService::new(transport, session.clone(), &auth_url)?
                .with_ttl(config.profile_ttl()),
        );
        let api = EmailApi::new(AuthorizedClient::new(Arc::clone(&profile)), config.email_url()?)
            .with_paging(config.page_offset, config.page_limit);
        let controller = CategoryController::new(api, Arc::new(RwLock::new(EmailStore::new())));

        Ok(Self {
            session,
            profile,
            controller,
        })
    }

    /// Runs one command.
    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Login { adafri_token } => self.login(&adafri_token).await,
            Command::Status => {
                self.status();
                Ok(())
            }
            Command::Accounts { action } => {
                self.accounts(action);
                Ok(())
            }
            Command::Org { action } => self.org(action),
            Command::List { category } => self.list(category).await,
            Command::Send {
                to,
                cc,
                subject,
                body,
            } => {
                let email = OutgoingEmail {
                    to,
                    cc,
                    subject,
                    content: body,
                    ..OutgoingEmail::default()
                };
                self.controller.api().send_email(&email).await?;
                println!("Sent.");
                Ok(())
            }
            Command::Move { id, category } => {
                self.controller.move_email(&id, category).await?;
                println!("Moved {id} to {category}.");
                Ok(())
            }
            Command::Drafts { action } => self.drafts(action).await,
            Command::Logout => {
                self.profile.clear_djombi_auth();
                self.session.clear_all_auth_data();
                println!("Signed out.");
                Ok(())
            }
        }
    }

    async fn login(&self, adafri_token: &str) -> anyhow::Result<()> {
        let djombi = self
            .profile
            .initialize_djombi_auth(adafri_token)
            .await
            .context("Login failed")?;
        info!("Logged in");

        let who = djombi
            .profile
            .display_name()
            .or_else(|| djombi.profile.email.clone())
            .unwrap_or_else(|| "unknown user".to_string());
        println!("Signed in as {who}");
        if self.session.selected_linked_email().is_none() {
            println!("Select an email account with `djombi accounts select <ID>`.");
        }
        Ok(())
    }

    fn status(&self) {
        let user = self.session.user_info();
        println!("Authenticated:  {}", self.session.is_authenticated());
        println!("Fully scoped:   {}", self.session.is_fully_authenticated());
        if let Some(email) = user.email {
            println!("User:           {} <{email}>", user.name.unwrap_or_default());
        }
        if let Some(org) = self.session.current_organization() {
            println!("Organization:   {}", org.organization_id);
        }
        match self.session.selected_linked_email() {
            Some(account) => println!(
                "Email account:  {} ({})",
                account.id,
                account.account_type.as_deref().unwrap_or("unspecified")
            ),
            None => println!("Email account:  none selected"),
        }
        if let Some(at) = self.session.last_login() {
            println!("Last login:     {}", at.to_rfc3339());
        }
    }

    fn accounts(&self, action: AccountsAction) {
        match action {
            AccountsAction::Select { id, account_type } => {
                let linked = self
                    .session
                    .linked_email_accounts()
                    .into_iter()
                    .find(|account| account.id == id);
                let mut selection = linked.map_or_else(
                    || SelectedEmailAccount::new(id.clone()),
                    |account| account.to_selection(),
                );
                if let Some(kind) = account_type {
                    selection = selection.with_type(kind);
                }
                self.session.set_selected_linked_email(&selection);
                println!("Selected {id}.");
            }
            AccountsAction::Link {
                id,
                email,
                account_type,
            } => {
                let mut accounts = self.session.linked_email_accounts();
                accounts.retain(|account| account.id != id);
                accounts.push(LinkedEmailAccount {
                    id: id.clone(),
                    email,
                    account_type,
                });
                self.session.set_linked_email_accounts(&accounts);
                println!("Linked {id}.");
            }
            AccountsAction::List => {
                let accounts = self.session.linked_email_accounts();
                if accounts.is_empty() {
                    println!("No linked accounts.");
                }
                let selected = self.session.selected_linked_email().map(|a| a.id);
                for account in accounts {
                    let marker = if selected.as_deref() == Some(account.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{marker} {}  {}  {}",
                        account.id,
                        account.email,
                        account.account_type.as_deref().unwrap_or("-")
                    );
                }
            }
            AccountsAction::Clear => {
                self.session.clear_email_data();
                println!("Cleared email account selection.");
            }
        }
    }

    fn org(&self, action: OrgAction) -> anyhow::Result<()> {
        match action {
            OrgAction::Set { id, data } => {
                let mut organization = Organization::new(id.clone());
                if let Some(raw) = data {
                    let value = serde_json::from_str(&raw).context("--data is not valid JSON")?;
                    organization = organization.with_data(value);
                }
                self.session.set_current_organization(&organization);
                println!("Organization set to {id}.");
            }
            OrgAction::Clear => {
                self.session.clear_organization_data();
                println!("Cleared organization.");
            }
        }
        Ok(())
    }

    async fn list(&self, category: djombi_core::Category) -> anyhow::Result<()> {
        self.controller.mount(category);
        match self.controller.sync(category).await {
            SyncOutcome::Loaded(_) => {
                let emails = self.controller.emails(category);
                if emails.is_empty() {
                    println!("No {category} emails.");
                }
                for email in &emails {
                    print_email(email);
                }
                Ok(())
            }
            SyncOutcome::Failed(message) => bail!(message),
            SyncOutcome::Skipped => {
                if self.session.selected_linked_email().is_none() {
                    bail!(djombi_core::EmailError::NoAccountSelected);
                }
                bail!("Not signed in. Run `djombi login --adafri-token <TOKEN>` first.")
            }
            SyncOutcome::Stale => bail!("Email account changed while loading; try again."),
        }
    }

    async fn drafts(&self, action: DraftsAction) -> anyhow::Result<()> {
        let api = self.controller.api();
        match action {
            DraftsAction::Save { to, subject, body } => {
                let draft = OutgoingEmail {
                    to,
                    subject,
                    content: body,
                    ..OutgoingEmail::default()
                };
                let ack = api.create_draft(&draft).await?;
                println!("{}", ack.message.unwrap_or_else(|| "Draft saved.".to_string()));
            }
            DraftsAction::Delete { id } => {
                api.delete_draft(&id).await?;
                println!("Deleted draft {id}.");
            }
        }
        Ok(())
    }
}

fn default_jar_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("djombi")
        .join("cookies.json")
}

fn print_email(email: &Email) {
    let unread = if email.is_read { " " } else { "●" };
    let urgent = if email.is_urgent { "!" } else { " " };
    let attachment = if email.has_attachment { "📎" } else { "  " };
    println!(
        "{unread}{urgent} {attachment} {:<24} {:<32} {:<40} {}",
        truncate(&email.id, 24),
        truncate(&email.from, 32),
        truncate(&email.subject, 40),
        email.timestamp
    );
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
