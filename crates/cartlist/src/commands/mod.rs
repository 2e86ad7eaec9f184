use anyhow::{Context, Result, bail};
use cartlist_app::{
    ClientConfig, FileBackend, HttpRemote, ItemStore, Notice, PreferenceStore, SyncError, Unauthenticated,
};
use cartlist_core::{ItemId, ItemPatch, StoreLabel, derive_view, store_counts};
use tokio::sync::broadcast;
use tracing::debug;

use crate::render;
use crate::{Command, ItemCommand, PrefsCommand};

/// Exit status for commands that need a fresh sign-in.
pub const AUTH_EXIT: u8 = 2;
const FAILURE_EXIT: u8 = 1;

type Store = ItemStore<HttpRemote>;

pub async fn run(command: Command, config: &ClientConfig) -> Result<()> {
    let command = match command {
        Command::Items(command) => command,
        Command::Prefs { action } => return run_prefs(action, config),
    };

    let store = connect(config)?;
    let mut notices = store.subscribe();
    store.load().await?;
    if flush_notices(&mut notices) {
        bail!("item list unavailable from {}", config.remote.endpoint);
    }

    let result = run_items(command, &store, config).await;
    flush_notices(&mut notices);
    store.close();
    result
}

/// Map an error chain to the process exit status.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    let needs_sign_in = err.chain().any(|cause| {
        cause.downcast_ref::<Unauthenticated>().is_some()
            || cause.downcast_ref::<SyncError>().is_some_and(SyncError::is_auth)
    });
    if needs_sign_in { AUTH_EXIT } else { FAILURE_EXIT }
}

fn connect(config: &ClientConfig) -> Result<Store> {
    let session = config.session();
    let remote = HttpRemote::from_config(&config.remote, session.clone())?;
    Ok(ItemStore::new(remote, session))
}

fn open_preferences(config: &ClientConfig) -> Result<PreferenceStore<FileBackend>> {
    let path = config
        .preferences_path()
        .context("no configuration directory; set [preferences] path in config.toml")?;
    Ok(PreferenceStore::load(FileBackend::open(path)))
}

/// Print pending notices to stderr; returns true when one reports a transport failure.
fn flush_notices(notices: &mut broadcast::Receiver<Notice>) -> bool {
    let mut transport_failed = false;
    while let Ok(notice) = notices.try_recv() {
        match notice {
            Notice::Resynced { items } => debug!(items, "resynced"),
            Notice::TransportFailure { .. } => {
                transport_failed = true;
                eprintln!("{notice}");
            }
            Notice::Unauthenticated { .. } => eprintln!("{notice}"),
        }
    }
    transport_failed
}

fn parse_id(store: &Store, raw: &str) -> Result<ItemId> {
    let id = ItemId::new(raw)?;
    if store.get(&id).is_none() {
        bail!("no item with id {id}");
    }
    Ok(id)
}

async fn run_items(command: ItemCommand, store: &Store, config: &ClientConfig) -> Result<()> {
    match command {
        ItemCommand::Ls { json } => {
            let prefs = open_preferences(config)?;
            let output = store.with_items(|items| {
                let view = derive_view(items, prefs.preferences());
                if json {
                    serde_json::to_string_pretty(&render::view_json(&view)).map(|text| text + "\n")
                } else {
                    Ok(render::view_text(&view))
                }
            })?;
            print!("{output}");
        }
        ItemCommand::Add { name, store: label } => {
            let label = label.map_or_else(StoreLabel::none, StoreLabel::new);
            let item = store.add(&name, label).await?;
            println!("added {}", render::item_line(&item));
        }
        ItemCommand::Toggle { id } => {
            let id = parse_id(store, &id)?;
            store.toggle(&id).await?;
            if let Some(item) = store.get(&id) {
                println!("{}", render::item_line(&item));
            }
        }
        ItemCommand::Rm { id } => {
            let id = parse_id(store, &id)?;
            store.remove(&id).await?;
            println!("removed {id}");
        }
        ItemCommand::Edit {
            id,
            name,
            store: label,
            no_store,
        } => {
            let id = parse_id(store, &id)?;
            let mut patch = ItemPatch::default();
            if let Some(name) = name {
                patch = patch.merge(ItemPatch::rename(name)?);
            }
            if no_store {
                patch = patch.merge(ItemPatch::move_to(StoreLabel::none()));
            } else if let Some(label) = label {
                patch = patch.merge(ItemPatch::move_to(StoreLabel::new(label)));
            }
            if patch.is_empty() {
                bail!("nothing to change; pass --name, --store or --no-store");
            }
            store.update(&id, patch).await?;
            if let Some(item) = store.get(&id) {
                println!("{}", render::item_line(&item));
            }
        }
        ItemCommand::Stores => {
            let counts = store.with_items(store_counts);
            print!("{}", render::stores_text(&counts));
        }
    }
    Ok(())
}

fn run_prefs(action: PrefsCommand, config: &ClientConfig) -> Result<()> {
    let mut prefs = open_preferences(config)?;
    match action {
        PrefsCommand::Show => {}
        PrefsCommand::Filter { stores, clear } => {
            if clear {
                prefs.clear_store_filter()?;
            } else {
                prefs.set_selected_stores(stores.iter().map(StoreLabel::new))?;
            }
        }
        PrefsCommand::Group { state } => prefs.set_group_by_store(state.enabled())?,
        PrefsCommand::HideCompleted { state } => prefs.set_hide_completed(state.enabled())?,
        PrefsCommand::Expand { store } => {
            let label = StoreLabel::new(&store);
            let expanded = prefs.toggle_expanded(label.clone())?;
            println!("{label}: {}", if expanded { "expanded" } else { "collapsed" });
        }
    }
    println!("{}", serde_json::to_string_pretty(prefs.preferences())?);
    Ok(())
}
