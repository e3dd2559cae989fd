//! Subcommand implementations

use anyhow::{anyhow, Result};
use clap::Subcommand;
use pioneer_sync::{
    Confirmation, Entity, FormInput, LiveStatus, Pioneer, Portal, RemoveOutcome, RoadmapItem,
    SdkError, StatusEditor, Submission, SyncState, ViewState,
};
use std::io::{self, BufRead, Write};

#[derive(Subcommand, Debug)]
pub enum PioneerCommand {
    /// List pioneers, newest first
    List {
        /// Case-insensitive match on name or page
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        page: String,
        /// PIONEER, PARTNER or FROZEN
        #[arg(long, default_value = "PIONEER")]
        status: String,
    },
    /// Change fields of an existing pioneer; omitted fields keep their value
    Edit {
        /// Store key (push keys start with '-')
        #[arg(allow_hyphen_values = true)]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Remove {
        /// Store key (push keys start with '-')
        #[arg(allow_hyphen_values = true)]
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CapacityCommand {
    Show,
    Set { value: String },
}

#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    Show,
    Set {
        /// Operational, Maintenance or Outage
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RoadmapCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// engine, media, dashboard, rocket or security
        #[arg(long, default_value = "engine")]
        icon: String,
    },
    Edit {
        /// Store key (push keys start with '-')
        #[arg(allow_hyphen_values = true)]
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    Remove {
        /// Store key (push keys start with '-')
        #[arg(allow_hyphen_values = true)]
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

/// Yes/no question on stdin
struct StdinPrompt;

impl Confirmation for StdinPrompt {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn confirmation(yes: bool) -> Box<dyn Confirmation> {
    if yes {
        Box::new(|_: &str| true)
    } else {
        Box::new(StdinPrompt)
    }
}

fn find<'a, E: Entity>(list: &'a [E], id: &str) -> Result<&'a E> {
    list.iter()
        .find(|entity| entity.id() == id)
        .ok_or_else(|| anyhow!("No entry with id {:?}", id))
}

fn print_pioneer(pioneer: &Pioneer) {
    println!(
        "{:<22} {:<24} {:<28} {}",
        pioneer.id, pioneer.name, pioneer.page, pioneer.status
    );
}

fn print_live_status(status: &LiveStatus) {
    println!(
        "Pioneers: {}  Capacity: {}  Available: {}",
        status.total_pioneers,
        status.total_capacity,
        status.available()
    );
}

pub async fn pioneers(portal: &Portal, command: PioneerCommand) -> Result<()> {
    let gateway = portal.gateway();
    let list = portal.pioneers().wait_ready().await?;
    let mut view = ViewState::<Pioneer>::new();

    match command {
        PioneerCommand::List { search } => {
            view.set_query(search.unwrap_or_default());
            let rows = view.visible(&list);
            for pioneer in &rows {
                print_pioneer(pioneer);
            }
            println!("{} of {} pioneers", rows.len(), list.len());
        }
        PioneerCommand::Add { name, page, status } => {
            view.open_add();
            let form = view.form_mut();
            form.name = name;
            form.page = page;
            form.status = status;
            submit_pioneer(portal, &mut view).await?;
        }
        PioneerCommand::Edit {
            id,
            name,
            page,
            status,
        } => {
            view.open_edit(find(list.as_slice(), &id)?);
            let form = view.form_mut();
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(page) = page {
                form.page = page;
            }
            if let Some(status) = status {
                form.status = status;
            }
            submit_pioneer(portal, &mut view).await?;
        }
        PioneerCommand::Remove { id, yes } => {
            match gateway.remove_pioneer(&id, confirmation(yes).as_ref()).await? {
                RemoveOutcome::Removed => {
                    println!("Removed {}", id);
                    settle(portal, |list| !list.iter().any(|p| p.id == id)).await?;
                }
                RemoveOutcome::Cancelled => println!("Cancelled"),
            }
        }
    }
    Ok(())
}

async fn submit_pioneer(portal: &Portal, view: &mut ViewState<Pioneer>) -> Result<()> {
    let submission = view
        .submission()
        .ok_or_else(|| anyhow!("No form is open"))?;
    let result = portal.gateway().submit_pioneer(&submission).await;
    view.finish(&result);
    let key = result?;
    println!("Saved pioneer {}", key);

    let fields = match &submission {
        Submission::Add(input) | Submission::Edit { input, .. } => input.validate()?,
    };
    settle(portal, |list| {
        list.iter().any(|p| {
            p.id == key && p.name == fields.name && p.page == fields.page && p.status == fields.status
        })
    })
    .await
}

/// Keep the portal open until the public pioneer count reflects our write
async fn settle(portal: &Portal, applied: impl Fn(&[Pioneer]) -> bool) -> Result<()> {
    let count = portal.settle_pioneers(applied).await?;
    println!("Active pioneers: {}", count);
    Ok(())
}

pub async fn capacity(portal: &Portal, command: CapacityCommand) -> Result<()> {
    match command {
        CapacityCommand::Show => {
            let status = portal.live_status().wait_ready().await?;
            print_live_status(&status);
        }
        CapacityCommand::Set { value } => {
            portal.pioneers().wait_ready().await?;
            let capacity = portal.gateway().update_capacity(&value).await?;
            println!("Capacity set to {}", capacity);
        }
    }
    Ok(())
}

pub async fn status(portal: &Portal, command: StatusCommand) -> Result<()> {
    let document = portal.server_status().wait_ready().await?;
    let mut editor = StatusEditor::new();
    editor.seed(&document);

    match command {
        StatusCommand::Show => {
            println!("{}: {}", document.status.label(), document.message);
        }
        StatusCommand::Set { status, message } => {
            if let Some(status) = status {
                editor.set_status(status);
            }
            if let Some(message) = message {
                editor.set_message(message);
            }
            let result = portal.gateway().update_server_status(editor.form()).await;
            editor.finish(&result);
            let saved = result?;
            println!("Server status updated: {} {}", saved.status, saved.message);
        }
    }
    Ok(())
}

pub async fn roadmap(portal: &Portal, command: RoadmapCommand) -> Result<()> {
    let gateway = portal.gateway();
    let list = portal.roadmap().wait_ready().await?;
    let mut view = ViewState::<RoadmapItem>::new();

    match command {
        RoadmapCommand::List { search } => {
            view.set_query(search.unwrap_or_default());
            for item in view.visible(&list) {
                println!("{:<22} [{}] {}: {}", item.id, item.icon, item.title, item.description);
            }
        }
        RoadmapCommand::Add {
            title,
            description,
            icon,
        } => {
            view.open_add();
            let form = view.form_mut();
            form.title = title;
            form.description = description;
            form.icon = icon;
            submit_roadmap(portal, &mut view).await?;
        }
        RoadmapCommand::Edit {
            id,
            title,
            description,
            icon,
        } => {
            view.open_edit(find(list.as_slice(), &id)?);
            let form = view.form_mut();
            if let Some(title) = title {
                form.title = title;
            }
            if let Some(description) = description {
                form.description = description;
            }
            if let Some(icon) = icon {
                form.icon = icon;
            }
            submit_roadmap(portal, &mut view).await?;
        }
        RoadmapCommand::Remove { id, yes } => {
            match gateway.remove_roadmap_item(&id, confirmation(yes).as_ref()).await? {
                RemoveOutcome::Removed => println!("Removed {}", id),
                RemoveOutcome::Cancelled => println!("Cancelled"),
            }
        }
    }
    Ok(())
}

async fn submit_roadmap(portal: &Portal, view: &mut ViewState<RoadmapItem>) -> Result<()> {
    let submission = view
        .submission()
        .ok_or_else(|| anyhow!("No form is open"))?;
    let result = portal.gateway().submit_roadmap(&submission).await;
    view.finish(&result);
    println!("Saved roadmap item {}", result?);
    Ok(())
}

/// Print every pioneer list and live status update until Ctrl-C or a
/// synchronizer fails
pub async fn watch(portal: &Portal) -> Result<()> {
    let mut pioneers = portal.pioneers().observe();
    let mut live = portal.live_status().observe();

    loop {
        match &*pioneers.borrow_and_update() {
            SyncState::Loading => println!("Loading pioneers..."),
            SyncState::Ready(list) => {
                println!("-- {} pioneers --", list.len());
                for pioneer in list.iter() {
                    print_pioneer(pioneer);
                }
            }
            SyncState::Failed(err) => return Err(SdkError::from(err.clone()).into()),
        }
        match &*live.borrow_and_update() {
            SyncState::Loading => println!("Loading live status..."),
            SyncState::Ready(status) => print_live_status(status),
            SyncState::Failed(err) => return Err(SdkError::from(err.clone()).into()),
        }

        tokio::select! {
            changed = pioneers.changed() => changed?,
            changed = live.changed() => changed?,
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped");
                return Ok(());
            }
        }
    }
}
