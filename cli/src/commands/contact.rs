use callcraft_core::records::{Contact, ContactForm};
use callcraft_core::{Outcome, RecordManager};
use clap::Subcommand;
use uuid::Uuid;

use super::Context;
use crate::util::{print_json, report};

#[derive(Subcommand)]
pub enum ContactCommands {
    /// Add a contact manually
    Add {
        /// Contact name
        #[arg(long)]
        name: String,
        /// Phone number (e.g. "+1234567890")
        #[arg(long)]
        phone: String,
    },
    /// List your contacts, newest first
    List,
    /// Delete a contact by id
    Delete {
        /// Contact UUID
        #[arg(long)]
        id: Uuid,
    },
}

fn manager(ctx: &Context) -> RecordManager<Contact> {
    let contacts = RecordManager::<Contact>::new(ctx.store.clone());
    match &ctx.contact_webhook {
        Some(url) => contacts.with_mirror(ctx.mirror.clone(), url.clone()),
        None => contacts,
    }
}

pub async fn run(ctx: &Context, command: ContactCommands) -> i32 {
    let mut contacts = manager(ctx);
    match command {
        ContactCommands::Add { name, phone } => {
            let mut form = ContactForm { name, phone };
            let outcome = contacts.create(ctx.user(), &mut form).await;
            // Let the mirror finish before the process exits.
            contacts.flush_mirrors().await;
            report(&outcome)
        }
        ContactCommands::List => match contacts.list(ctx.user()).await {
            Outcome::Loaded { count } => {
                print_json(&serde_json::json!({
                    "count": count,
                    "contacts": contacts.records(),
                }));
                0
            }
            other => report(&other),
        },
        ContactCommands::Delete { id } => report(&contacts.delete(ctx.user(), id).await),
    }
}
