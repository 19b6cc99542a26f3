use callcraft_core::records::{Agent, AgentForm, Language};
use callcraft_core::{Outcome, RecordManager};
use clap::{Subcommand, ValueEnum};

use super::Context;
use crate::util::{exit_error, print_json, read_text_from_file, report};

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Create a new voice agent
    Create {
        /// Agent name (e.g. "Sales Assistant")
        #[arg(long)]
        name: String,
        /// Greeting the agent opens every call with
        #[arg(long)]
        greeting: String,
        /// Behavior prompt: goals and conversation style
        #[arg(long, required_unless_present = "prompt_file")]
        prompt: Option<String>,
        /// Read the prompt from a file (use '-' for stdin)
        #[arg(long, short = 'f', conflicts_with = "prompt")]
        prompt_file: Option<String>,
        /// Spoken language
        #[arg(long, value_enum, default_value_t = AgentLanguage::English)]
        language: AgentLanguage,
    },
    /// List your agents
    List,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum AgentLanguage {
    English,
    Spanish,
    French,
    German,
    Italian,
}

impl From<AgentLanguage> for Language {
    fn from(value: AgentLanguage) -> Self {
        match value {
            AgentLanguage::English => Language::English,
            AgentLanguage::Spanish => Language::Spanish,
            AgentLanguage::French => Language::French,
            AgentLanguage::German => Language::German,
            AgentLanguage::Italian => Language::Italian,
        }
    }
}

pub async fn run(ctx: &Context, command: AgentCommands) -> i32 {
    match command {
        AgentCommands::Create {
            name,
            greeting,
            prompt,
            prompt_file,
            language,
        } => {
            let prompt = match (prompt, prompt_file) {
                (Some(p), _) => p,
                (None, Some(path)) => read_text_from_file(&path)
                    .unwrap_or_else(|e| exit_error(&e, Some("Check the --prompt-file path"))),
                (None, None) => String::new(),
            };
            let mut form = AgentForm {
                name,
                greeting,
                prompt,
                language: language.into(),
            };
            create(ctx, &mut form).await
        }
        AgentCommands::List => list(ctx).await,
    }
}

async fn create(ctx: &Context, form: &mut AgentForm) -> i32 {
    let mut agents = RecordManager::<Agent>::new(ctx.store.clone());
    report(&agents.create(ctx.user(), form).await)
}

async fn list(ctx: &Context) -> i32 {
    let mut agents = RecordManager::<Agent>::new(ctx.store.clone());
    match agents.list(ctx.user()).await {
        Outcome::Loaded { .. } => {
            print_json(&agents.records());
            0
        }
        other => report(&other),
    }
}
