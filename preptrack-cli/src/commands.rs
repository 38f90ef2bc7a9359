use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use preptrack::domain::{
    dedup_tags, format_date, CreateEntryBody, EntriesFilter, Recurrence, RecurrenceFrequency,
    UpdateEntryBody, UpdateTaskStatusBody,
};
use preptrack::{EntryService, PersistencePolicy, PrepClient};
use time::{Date, OffsetDateTime};

use crate::authenticator::CommandAuthenticator;
use crate::cli::{AddArgs, Commands, EntriesCommand, ListArgs, PasskeysCommand, UpdateArgs};
use crate::config::PrepConfig;
use crate::output;

const NOT_SIGNED_IN: &str = "Not signed in. Run `preptrack login` first.";

pub async fn run(command: Commands, client: &PrepClient, config: &PrepConfig) -> Result<()> {
    match command {
        Commands::Login {
            email,
            passkey,
            no_remember,
        } => login(client, config, email, passkey, no_remember).await,
        Commands::Signup { email, no_remember } => {
            let email = email_or_prompt(email)?;
            let password = rpassword::prompt_password("Password: ")?;
            let user = client
                .session()
                .signup(&email, &password, PersistencePolicy::from_remember(!no_remember))
                .await
                .context("Signup failed")?;
            println!("Welcome, {}.", user.display_name());
            Ok(())
        }
        Commands::Logout => {
            client.session().logout();
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => {
            match client.session_handle().user() {
                Some(user) if client.session_handle().is_authenticated() => {
                    println!("{}", output::user(&user))
                }
                _ => println!("Not signed in."),
            }
            Ok(())
        }
        Commands::Entries { command } => {
            require_session(client)?;
            entries(client, command).await
        }
        Commands::Today => {
            require_session(client)?;
            let today = client
                .entries()
                .fetch_today()
                .await
                .context("Failed to fetch today's tasks")?;
            println!("{}", output::day_view(&today));
            Ok(())
        }
        Commands::History { date, from, to } => {
            require_session(client)?;
            history(client, date, from, to).await
        }
        Commands::Status {
            entry_id,
            status,
            date,
            notes,
        } => {
            require_session(client)?;
            let body = UpdateTaskStatusBody {
                entry: entry_id,
                date: date.unwrap_or_else(local_today),
                status,
                notes,
            };
            client
                .entries()
                .update_task_status(&body)
                .await
                .context("Failed to update task status")?;
            println!(
                "{} on {} is now {}.",
                body.entry,
                format_date(body.date),
                body.status.label()
            );
            Ok(())
        }
        Commands::Stats { days } => {
            require_session(client)?;
            let stats = client.stats();
            let streaks = stats.streaks().await.context("Failed to fetch streaks")?;
            let categories = stats
                .categories()
                .await
                .context("Failed to fetch category stats")?;
            let progress = stats
                .progress(days)
                .await
                .context("Failed to fetch progress")?;
            println!("{}", output::stats(&streaks, &categories, &progress));
            Ok(())
        }
        Commands::Passkeys { command } => {
            require_session(client)?;
            passkeys(client, config, command).await
        }
        // Handled before a client exists.
        Commands::ConfigPath => Ok(()),
    }
}

async fn login(
    client: &PrepClient,
    config: &PrepConfig,
    email: Option<String>,
    passkey: bool,
    no_remember: bool,
) -> Result<()> {
    let policy = PersistencePolicy::from_remember(!no_remember);
    let user = if passkey {
        let authenticator = authenticator(config)?;
        client
            .session()
            .passkey_login(email.as_deref(), policy, &authenticator)
            .await
            .context("Passkey login failed")?
    } else {
        let email = email_or_prompt(email)?;
        let password = rpassword::prompt_password("Password: ")?;
        client
            .session()
            .login(&email, &password, policy)
            .await
            .context("Login failed")?
    };
    println!("Signed in as {}.", user.display_name());
    Ok(())
}

async fn entries(client: &PrepClient, command: EntriesCommand) -> Result<()> {
    let store = client.entries();
    match command {
        EntriesCommand::List(args) => {
            store
                .fetch_entries(&list_filter(args))
                .await
                .context("Failed to fetch entries")?;
            let state = store.state();
            if state.entries.is_empty() {
                println!("No entries.");
            }
            for entry in &state.entries {
                println!("{}", output::entry_line(entry));
            }
            if let Some(p) = state.pagination.filter(|p| p.total_pages > 1) {
                println!("\nPage {} of {} ({} entries)", p.page, p.total_pages, p.total);
            }
        }
        EntriesCommand::Show { id } => {
            let entry = store
                .service()
                .get(&id)
                .await
                .with_context(|| format!("Failed to fetch entry {}", id))?;
            println!("{}", output::entry_details(&entry));
        }
        EntriesCommand::Add(args) => {
            let created = store
                .create_entry(&create_body(args)?)
                .await
                .context("Failed to create entry")?;
            println!("Created {}", output::entry_line(&created));
        }
        EntriesCommand::Update(args) => {
            let id = args.id.clone();
            let body = update_body(args);
            if body.is_empty() {
                bail!("Nothing to update. Pass at least one field to change.");
            }
            let updated = store
                .update_entry(&id, &body)
                .await
                .context("Failed to update entry")?;
            println!("Updated {}", output::entry_line(&updated));
        }
        EntriesCommand::Delete { ids } => {
            if let [id] = ids.as_slice() {
                store.delete_entry(id).await.context("Failed to delete entry")?;
                println!("Deleted {}.", id);
            } else {
                let result = store
                    .service()
                    .bulk_delete(&ids)
                    .await
                    .context("Failed to delete entries")?;
                println!("Deleted {} entries.", result.deleted_count);
            }
        }
        EntriesCommand::Search { query } => {
            let found = store.service().search(&query).await.context("Search failed")?;
            if found.is_empty() {
                println!("No matches for \"{}\".", query);
            }
            for entry in &found {
                println!("{}", output::entry_line(entry));
            }
        }
        EntriesCommand::Tags => {
            let tags = store.service().tags().await.context("Failed to fetch tags")?;
            println!("{}", output::counts(tags.iter().map(|t| (t.tag.as_str(), t.count))));
        }
        EntriesCommand::Topics { category } => {
            let topics = store
                .service()
                .topics(category)
                .await
                .context("Failed to fetch topics")?;
            println!("{}", output::counts(topics.iter().map(|t| (t.topic.as_str(), t.count))));
        }
        EntriesCommand::Sources => {
            let sources = store
                .service()
                .sources()
                .await
                .context("Failed to fetch sources")?;
            println!(
                "{}",
                output::counts(sources.iter().map(|s| (s.source.as_str(), s.count)))
            );
        }
    }
    Ok(())
}

async fn history(
    client: &PrepClient,
    date: Option<Date>,
    from: Option<Date>,
    to: Option<Date>,
) -> Result<()> {
    let service = client.entries().service();
    if let (Some(from), Some(to)) = (from, to) {
        let range = service
            .history_range(from, to)
            .await
            .context("Failed to fetch history")?;
        let days: Vec<String> = range.days.iter().map(output::day_view).collect();
        println!("{}", days.join("\n\n"));
        return Ok(());
    }

    let date = match date {
        Some(date) => date,
        None => local_today()
            .previous_day()
            .context("No day before today")?,
    };
    let day = service
        .history_day(date)
        .await
        .context("Failed to fetch history")?;
    println!("{}", output::day_view(&day));
    Ok(())
}

async fn passkeys(client: &PrepClient, config: &PrepConfig, command: PasskeysCommand) -> Result<()> {
    let account = client.account();
    match command {
        PasskeysCommand::List => {
            let credentials = account
                .list_credentials()
                .await
                .context("Failed to list passkeys")?;
            println!("{}", output::credentials(&credentials));
        }
        PasskeysCommand::Add { name } => {
            let authenticator = authenticator(config)?;
            let credential = account
                .register_passkey(&authenticator, name.as_deref())
                .await
                .context("Failed to register passkey")?;
            println!("Registered passkey {}.", credential.display_name());
        }
        PasskeysCommand::Rename { id, name } => {
            let credential = account
                .rename_credential(&id, &name)
                .await
                .context("Failed to rename passkey")?;
            println!("Renamed {} to {}.", credential.id, credential.display_name());
        }
        PasskeysCommand::Delete { id } => {
            account
                .delete_credential(&id)
                .await
                .context("Failed to delete passkey")?;
            println!("Deleted passkey {}.", id);
        }
        PasskeysCommand::OptOut => {
            let message = account
                .opt_out()
                .await
                .context("Failed to turn off passkeys")?;
            println!("{}", message);
        }
    }
    Ok(())
}

fn require_session(client: &PrepClient) -> Result<()> {
    if !client.session_handle().is_authenticated() {
        bail!(NOT_SIGNED_IN);
    }
    Ok(())
}

fn authenticator(config: &PrepConfig) -> Result<CommandAuthenticator> {
    config
        .authenticator_command
        .as_deref()
        .and_then(CommandAuthenticator::from_command_line)
        .context("No passkey helper configured. Set `authenticator_command` in the config file.")
}

fn email_or_prompt(email: Option<String>) -> Result<String> {
    if let Some(email) = email {
        return Ok(email);
    }
    print!("Email: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let email = line.trim().to_string();
    if email.is_empty() {
        bail!("Email is required");
    }
    Ok(email)
}

fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

fn list_filter(args: ListArgs) -> EntriesFilter {
    EntriesFilter {
        category: args.category,
        topic: args.topic,
        difficulty: args.difficulty,
        status: args.status,
        source: args.source,
        tag: args.tag,
        date: args.date,
        from: args.from,
        to: args.to,
        page: args.page,
        limit: args.limit,
    }
}

fn create_body(args: AddArgs) -> Result<CreateEntryBody> {
    let mut body = CreateEntryBody::new(
        args.title,
        args.category,
        args.deadline.unwrap_or_else(local_today),
    )
    .with_tags(args.tags);
    body.difficulty = args.difficulty;
    body.topic = args.topic;
    body.source = args.source;
    body.url = args.url;
    body.notes = args.notes;

    match args.repeat {
        Some(frequency) => {
            if frequency == RecurrenceFrequency::Custom && args.days.is_empty() {
                bail!("Custom recurrence needs --days");
            }
            let days_of_week = (!args.days.is_empty()).then_some(args.days);
            body = body.recurring(
                Recurrence {
                    frequency,
                    days_of_week,
                },
                args.until,
            );
        }
        None if !args.days.is_empty() => bail!("--days only applies with --repeat"),
        None => {}
    }
    Ok(body)
}

fn update_body(args: UpdateArgs) -> UpdateEntryBody {
    UpdateEntryBody {
        title: args.title,
        notes: args.notes,
        solution: args.solution,
        status: args.status,
        category: args.category,
        topic: args.topic,
        difficulty: args.difficulty,
        source: args.source,
        url: args.url,
        tags: args.tags.map(dedup_tags),
        deadline: args.deadline.map(format_date),
        ..Default::default()
    }
}
