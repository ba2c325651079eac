use std::path::PathBuf;

use anyhow::{Context, bail};
use secrecy::SecretString;

use crate::{
    achievements::{AchievementTracker, read_reading_seconds},
    chapter_file::parse_chapter_file_name,
    configuration::Config,
    context::{ClientContext, SharedClientContext},
    imgbb::ImageHost,
    library::Library,
    profile::Profile,
    reading_time::format_reading_time,
    session::LOGIN_FAILED,
    storage::{FileStore, SharedStore},
};

pub const PASSWORD_ENV: &str = "MANGASHELF_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Sync,
    Login { email: String },
    Logout,
    Equip { achievement_id: String },
    Parse { file_names: Vec<String> },
    Upload { paths: Vec<PathBuf> },
}

impl Command {
    pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, anyhow::Error> {
        let command = args.next().unwrap_or_else(|| "status".into());

        Ok(match command.as_str() {
            "status" => Command::Status,
            "sync" => Command::Sync,
            "login" => Command::Login {
                email: args.next().context("Usage: login <email>")?,
            },
            "logout" => Command::Logout,
            "equip" => Command::Equip {
                achievement_id: args.next().context("Usage: equip <achievement id>")?,
            },
            "parse" => Command::Parse {
                file_names: args.collect(),
            },
            "upload" => Command::Upload {
                paths: args.map(PathBuf::from).collect(),
            },
            other => bail!(
                "Unknown command `{other}`. \
                 Use one of status, sync, login, logout, equip, parse, upload."
            ),
        })
    }
}

pub struct Application {
    ctx: SharedClientContext,
}

impl Application {
    pub fn build(config: Config) -> Result<Self, anyhow::Error> {
        let store: SharedStore = std::sync::Arc::new(
            FileStore::open(&config.storage.path).context("Unable opening local store")?,
        );

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: SharedStore) -> Result<Self, anyhow::Error> {
        let ctx = ClientContext::init(config, store).context("Failed creating client")?;
        Ok(Application { ctx })
    }

    pub fn context(&self) -> &SharedClientContext {
        &self.ctx
    }

    pub async fn run(self, command: Command) -> Result<(), anyhow::Error> {
        let result = match command {
            Command::Status => {
                self.status().await;
                Ok(())
            }
            Command::Sync => {
                self.sync().await;
                Ok(())
            }
            Command::Login { email } => self.login(&email).await,
            Command::Logout => {
                self.ctx.session.logout();
                println!("Logged out");
                Ok(())
            }
            Command::Equip { achievement_id } => self.equip(&achievement_id).await,
            Command::Parse { file_names } => {
                for name in file_names {
                    let parsed = parse_chapter_file_name(&name);
                    println!("{}\t{}\t{}", parsed.number, parsed.title, parsed.original_file_name);
                }
                Ok(())
            }
            Command::Upload { paths } => self.upload(paths).await,
        };

        self.ctx.teardown();
        result
    }

    async fn status(&self) {
        let profile = Profile::new(self.ctx.clone()).load().await;
        match self.ctx.session.user() {
            Some(user) => println!(
                "Signed in as {} <{}>, {} points",
                user.name, user.email, profile.points
            ),
            None => println!("Guest"),
        }
        if let Some(title) = profile.equipped {
            println!("Title: {} ({})", title.title, title.rarity);
        }

        let time = format_reading_time(read_reading_seconds(self.ctx.store.as_ref()));
        println!(
            "Reading time: {}d {}h {}m",
            time.days, time.hours, time.minutes
        );
    }

    async fn sync(&self) {
        let library = Library::new(self.ctx.clone());
        library.mount().await;

        println!(
            "Library {:?}: {} bookmarks, {} history entries",
            library.phase(),
            library.bookmarks().len(),
            library.history().len()
        );
        if !library.dirty_ids().is_empty() {
            println!("Pending bookmark changes: {}", library.dirty_ids().join(", "));
        }

        let tracker = AchievementTracker::new(self.ctx.clone());
        if let Some(achievement) = tracker.evaluate(&library).await {
            println!("Unlocked: {} ({})", achievement.title, achievement.rarity.as_str());
        }
        println!("Achievements: {}", tracker.unlocked().join(", "));
    }

    async fn equip(&self, achievement_id: &str) -> Result<(), anyhow::Error> {
        let library = Library::new(self.ctx.clone());
        library.mount().await;
        let tracker = AchievementTracker::new(self.ctx.clone());
        tracker.evaluate(&library).await;

        let title = Profile::new(self.ctx.clone())
            .equip_title(achievement_id, &tracker.unlocked())
            .await
            .with_context(|| format!("Unable equipping `{achievement_id}`"))?;
        println!("Equipped {} ({})", title.title, title.rarity);
        Ok(())
    }

    async fn login(&self, email: &str) -> Result<(), anyhow::Error> {
        let password: SecretString = std::env::var(PASSWORD_ENV)
            .with_context(|| format!("Set {PASSWORD_ENV} to log in"))?
            .into();

        let outcome = self.ctx.session.login(email, password).await;
        if !outcome.success {
            bail!(outcome.error.unwrap_or_else(|| LOGIN_FAILED.to_string()));
        }

        println!("Logged in as {email}");
        Ok(())
    }

    async fn upload(&self, paths: Vec<PathBuf>) -> Result<(), anyhow::Error> {
        let host = ImageHost::new(&self.ctx.config.imgbb)?;
        if !host.is_configured() {
            bail!("imgbb.api_key is not configured");
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Unable reading {}", path.display()))?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push((name, bytes));
        }

        let urls = host
            .upload_many(files, |percent, current, total| {
                println!("[{percent:>3}%] {current}/{total}");
            })
            .await?;
        for url in urls {
            println!("{url}");
        }

        Ok(())
    }
}
