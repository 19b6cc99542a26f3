use callcraft_core::records::{Profile, ProfileForm};
use callcraft_core::{Outcome, RecordManager};
use clap::Subcommand;

use super::Context;
use crate::util::{print_json, report};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show your profile
    Show,
    /// Update your display name (email is managed by the auth provider)
    Update {
        #[arg(long)]
        full_name: String,
    },
}

pub async fn run(ctx: &Context, command: ProfileCommands) -> i32 {
    let mut profiles = RecordManager::<Profile>::new(ctx.store.clone());
    let Some(user) = ctx.user() else {
        return report(&Outcome::Skipped);
    };

    match command {
        ProfileCommands::Show => match profiles.list(Some(user)).await {
            Outcome::Loaded { .. } => {
                print_json(&profiles.view(user));
                0
            }
            other => report(&other),
        },
        ProfileCommands::Update { full_name } => {
            let form = ProfileForm { full_name };
            report(&profiles.update(Some(user), &form).await)
        }
    }
}
