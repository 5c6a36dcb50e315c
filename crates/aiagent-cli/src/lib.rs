#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use aiagent_client::api::agent::AgentDraft;
use aiagent_client::api::apps::{SortField, SortOrder};
use aiagent_client::api::knowledge_base::{DocumentUpload, KnowledgeBaseDraft};
use aiagent_client::api::plugin::OpenApiFile;
use aiagent_client::api::workflow::ExecuteWorkflowRequest;
use aiagent_client::{
    ApiClient, ClientConfig, GuardDecision, RouteGuard, RouteTable, SessionState, SessionStore,
};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};

pub const ENV_LOG_FILTER: &str = "AIAGENT_LOG_FILTER";

#[derive(Parser, Debug)]
#[command(name = "aiagent")]
#[command(about = "Manage agents, knowledge bases, workflows and plugins")]
pub struct AiAgentCli {
    /// Overrides AIAGENT_API_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Overrides AIAGENT_STATE_PATH.
    #[arg(long, global = true)]
    pub state_path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and persist the token
    Login(CredentialArgs),
    /// Create an account, then sign in
    Register(CredentialArgs),
    /// Forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show what the console guard decides for a path
    RouteCheck {
        path: String,
        #[arg(long, default_value = "/")]
        home: String,
    },
    #[command(flatten)]
    Resource(ResourceCommand),
}

/// Commands that need a signed-in session.
#[derive(Subcommand, Debug)]
pub enum ResourceCommand {
    /// Agent management
    #[command(subcommand)]
    Agents(AgentCommand),
    /// Knowledge bases and their documents
    #[command(subcommand)]
    KnowledgeBases(KnowledgeBaseCommand),
    /// Workflow definitions and executions
    #[command(subcommand)]
    Workflows(WorkflowCommand),
    /// OpenAPI plugins
    #[command(subcommand)]
    Plugins(PluginCommand),
    /// Navigation menus for the current user
    Menus,
    /// Resource counts
    Dashboard,
    /// User administration (admin only)
    #[command(subcommand)]
    Users(UserCommand),
    /// Marketplace listings
    Apps(AppsArgs),
}

#[derive(Args, Debug)]
pub struct CredentialArgs {
    #[arg(long, short)]
    pub username: String,
    #[arg(long, short)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommand {
    List,
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        system_prompt: Option<String>,
        #[arg(long)]
        workflow_id: Option<i64>,
    },
    Delete {
        id: i64,
    },
    Test {
        id: i64,
        #[arg(long, short)]
        question: String,
    },
    Publish {
        id: i64,
    },
    Chat {
        id: i64,
        #[arg(long, short)]
        question: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeBaseCommand {
    List,
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: i64,
    },
    Documents {
        id: i64,
    },
    Upload {
        id: i64,
        file: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    DeleteDocument {
        id: i64,
        document_id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    List,
    Get {
        id: i64,
    },
    Delete {
        id: i64,
    },
    /// Runs a workflow; inputs are `key=value` pairs
    Execute {
        id: i64,
        #[arg(long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },
    Executions {
        id: i64,
        #[arg(long)]
        execution_id: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PluginCommand {
    List {
        #[arg(long)]
        enabled: bool,
    },
    Get {
        id: i64,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        file: PathBuf,
    },
    Toggle {
        id: i64,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List,
    Delete { username: String },
}

#[derive(Args, Debug)]
pub struct AppsArgs {
    #[arg(long, value_parser = parse_sort_field)]
    pub sort_by: Option<SortField>,
    #[arg(long, value_parser = parse_sort_order)]
    pub order: Option<SortOrder>,
    #[arg(long, conflicts_with_all = ["sort_by", "order"])]
    pub category: Option<String>,
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

fn parse_sort_field(raw: &str) -> Result<SortField, String> {
    SortField::parse(raw).ok_or_else(|| format!("unsupported sort field `{raw}`"))
}

fn parse_sort_order(raw: &str) -> Result<SortOrder, String> {
    SortOrder::parse(raw).ok_or_else(|| format!("unsupported sort order `{raw}`"))
}

pub fn init_tracing() {
    let filter = std::env::var(ENV_LOG_FILTER)
        .ok()
        .and_then(|value| tracing_subscriber::EnvFilter::try_new(value).ok())
        .or_else(|| tracing_subscriber::EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &AiAgentCli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("invalid client configuration")?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config.base_url = base_url.to_string();
    }
    if let Some(path) = cli.state_path.clone() {
        config = config.with_state_path(path);
    }
    Ok(config)
}

pub async fn run() -> Result<()> {
    let cli = AiAgentCli::parse();
    init_tracing();

    let config = load_config(&cli)?;
    let client = ApiClient::from_config(&config)?;
    let session = SessionStore::for_client(client.clone());
    let state = session.init().await;
    tracing::debug!(target: "aiagent.session", ?state, "session initialized");

    match cli.command {
        Commands::Login(args) => {
            session.login(&args.username, &args.password).await?;
            println!("signed in as {}", session.user_name().await);
        }
        Commands::Register(args) => {
            session.register(&args.username, &args.password).await?;
            println!("registered and signed in as {}", session.user_name().await);
        }
        Commands::Logout => {
            session.logout().await;
            println!("signed out");
        }
        Commands::Whoami => match session.snapshot().await.user {
            Some(user) => print_json(&user)?,
            None => println!("{}", session.user_name().await),
        },
        Commands::RouteCheck { path, home } => {
            let meta = RouteTable::console().resolve(&path);
            let guard = RouteGuard::new().with_home_path(home);
            match guard.evaluate(&meta, &session).await {
                GuardDecision::Allow => println!("allow {path}"),
                GuardDecision::Redirect(target) => println!("redirect {path} -> {target}"),
            }
        }
        Commands::Resource(command) => {
            if state == SessionState::Anonymous {
                bail!("not signed in; run `aiagent login` first");
            }
            run_resource(&client, command).await?;
        }
    }
    Ok(())
}

async fn run_resource(client: &ApiClient, command: ResourceCommand) -> Result<()> {
    match command {
        ResourceCommand::Agents(command) => run_agents(client, command).await,
        ResourceCommand::KnowledgeBases(command) => run_knowledge_bases(client, command).await,
        ResourceCommand::Workflows(command) => run_workflows(client, command).await,
        ResourceCommand::Plugins(command) => run_plugins(client, command).await,
        ResourceCommand::Menus => print_json(&client.menus().await?),
        ResourceCommand::Dashboard => print_json(&client.dashboard_stats().await?),
        ResourceCommand::Users(UserCommand::List) => print_json(&client.list_users().await?),
        ResourceCommand::Users(UserCommand::Delete { username }) => {
            client.delete_user(&username).await?;
            println!("deleted user {username}");
            Ok(())
        }
        ResourceCommand::Apps(args) => {
            let apps = match args.category.as_deref() {
                Some(category) => client.list_apps_by_category(category).await?,
                None => client.list_apps(args.sort_by, args.order).await?,
            };
            print_json(&apps)
        }
    }
}

async fn run_agents(client: &ApiClient, command: AgentCommand) -> Result<()> {
    match command {
        AgentCommand::List => print_json(&client.list_agents().await?),
        AgentCommand::Get { id } => print_json(&client.get_agent(id).await?),
        AgentCommand::Create {
            name,
            description,
            system_prompt,
            workflow_id,
        } => {
            let draft = AgentDraft {
                name,
                description,
                system_prompt,
                workflow_id,
                ..AgentDraft::default()
            };
            print_json(&client.create_agent(&draft).await?)
        }
        AgentCommand::Delete { id } => {
            client.delete_agent(id).await?;
            println!("deleted agent {id}");
            Ok(())
        }
        AgentCommand::Test { id, question } => {
            println!("{}", client.test_agent(id, &question).await?);
            Ok(())
        }
        AgentCommand::Publish { id } => print_json(&client.publish_agent(id).await?),
        AgentCommand::Chat { id, question } => {
            print_json(&client.chat_with_agent(id, &question).await?)
        }
    }
}

async fn run_knowledge_bases(client: &ApiClient, command: KnowledgeBaseCommand) -> Result<()> {
    match command {
        KnowledgeBaseCommand::List => print_json(&client.list_knowledge_bases().await?),
        KnowledgeBaseCommand::Get { id } => print_json(&client.get_knowledge_base(id).await?),
        KnowledgeBaseCommand::Create { name, description } => {
            let draft = KnowledgeBaseDraft { name, description };
            print_json(&client.create_knowledge_base(&draft).await?)
        }
        KnowledgeBaseCommand::Delete { id } => {
            client.delete_knowledge_base(id).await?;
            println!("deleted knowledge base {id}");
            Ok(())
        }
        KnowledgeBaseCommand::Documents { id } => print_json(&client.list_documents(id).await?),
        KnowledgeBaseCommand::Upload { id, file, mime } => {
            let upload = DocumentUpload {
                file_name: file_name(&file)?,
                bytes: tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("read {}", file.display()))?,
                mime,
            };
            print_json(&client.upload_document(id, upload).await?)
        }
        KnowledgeBaseCommand::DeleteDocument { id, document_id } => {
            client.delete_document(id, document_id).await?;
            println!("deleted document {document_id}");
            Ok(())
        }
    }
}

async fn run_workflows(client: &ApiClient, command: WorkflowCommand) -> Result<()> {
    match command {
        WorkflowCommand::List => print_json(&client.list_workflows().await?),
        WorkflowCommand::Get { id } => print_json(&client.get_workflow(id).await?),
        WorkflowCommand::Delete { id } => {
            client.delete_workflow(id).await?;
            println!("deleted workflow {id}");
            Ok(())
        }
        WorkflowCommand::Execute { id, inputs } => {
            let request = ExecuteWorkflowRequest {
                input_params: inputs
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect::<Map<String, Value>>(),
            };
            print_json(&client.execute_workflow(id, &request).await?)
        }
        WorkflowCommand::Executions {
            id,
            execution_id: Some(execution_id),
        } => print_json(&client.get_workflow_execution(id, execution_id).await?),
        WorkflowCommand::Executions {
            id,
            execution_id: None,
        } => print_json(&client.list_workflow_executions(id).await?),
    }
}

async fn run_plugins(client: &ApiClient, command: PluginCommand) -> Result<()> {
    match command {
        PluginCommand::List { enabled: true } => print_json(&client.list_enabled_plugins().await?),
        PluginCommand::List { enabled: false } => print_json(&client.list_plugins().await?),
        PluginCommand::Get { id } => print_json(&client.get_plugin(id).await?),
        PluginCommand::Register {
            name,
            description,
            file,
        } => {
            let spec = OpenApiFile {
                file_name: file_name(&file)?,
                bytes: tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("read {}", file.display()))?,
            };
            print_json(
                &client
                    .register_plugin(&name, description.as_deref(), spec)
                    .await?,
            )
        }
        PluginCommand::Toggle { id, enabled } => {
            print_json(&client.toggle_plugin(id, enabled).await?)
        }
        PluginCommand::Delete { id } => {
            client.delete_plugin(id).await?;
            println!("deleted plugin {id}");
            Ok(())
        }
    }
}

fn file_name(path: &std::path::Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no file name", path.display()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn cli_requires_subcommand() {
        let err = match AiAgentCli::try_parse_from(["aiagent"]) {
            Ok(_) => panic!("expected missing subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn login_takes_credentials() {
        let cli = AiAgentCli::try_parse_from(["aiagent", "login", "-u", "alice", "-p", "secret"])
            .expect("parse login");
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.username, "alice");
                assert_eq!(args.password, "secret");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn workflow_inputs_parse_as_pairs() {
        let cli = AiAgentCli::try_parse_from([
            "aiagent",
            "workflows",
            "execute",
            "3",
            "--input",
            "topic=rust",
            "--input",
            "tone=dry",
        ])
        .expect("parse execute");
        match cli.command {
            Commands::Resource(ResourceCommand::Workflows(WorkflowCommand::Execute { id, inputs })) => {
                assert_eq!(id, 3);
                assert_eq!(
                    inputs,
                    vec![
                        ("topic".to_string(), "rust".to_string()),
                        ("tone".to_string(), "dry".to_string())
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let err = AiAgentCli::try_parse_from(["aiagent", "workflows", "execute", "3", "--input", "nope"])
            .expect_err("missing equals");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn apps_sorting_is_validated() {
        let cli = AiAgentCli::try_parse_from([
            "aiagent", "apps", "--sort-by", "rating", "--order", "asc",
        ])
        .expect("parse apps");
        match cli.command {
            Commands::Resource(ResourceCommand::Apps(args)) => {
                assert_eq!(args.sort_by, Some(SortField::Rating));
                assert_eq!(args.order, Some(SortOrder::Asc));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let err = AiAgentCli::try_parse_from(["aiagent", "apps", "--sort-by", "name"])
            .expect_err("unsupported field");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn plugin_toggle_requires_explicit_state() {
        let cli = AiAgentCli::try_parse_from(["aiagent", "plugins", "toggle", "5", "--enabled", "false"])
            .expect("parse toggle");
        match cli.command {
            Commands::Resource(ResourceCommand::Plugins(PluginCommand::Toggle { id, enabled })) => {
                assert_eq!(id, 5);
                assert!(!enabled);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn knowledge_base_subcommand_uses_kebab_case() {
        let cli = AiAgentCli::try_parse_from([
            "aiagent",
            "knowledge-bases",
            "delete-document",
            "4",
            "9",
        ])
        .expect("parse delete-document");
        assert!(matches!(
            cli.command,
            Commands::Resource(ResourceCommand::KnowledgeBases(
                KnowledgeBaseCommand::DeleteDocument {
                    id: 4,
                    document_id: 9
                }
            ))
        ));
    }

    #[test]
    fn route_check_defaults_home_to_root() {
        let cli = AiAgentCli::try_parse_from(["aiagent", "route-check", "/users"])
            .expect("parse route-check");
        match cli.command {
            Commands::RouteCheck { path, home } => {
                assert_eq!(path, "/users");
                assert_eq!(home, "/");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn resource_commands_parse_at_the_top_level() {
        let cli = AiAgentCli::try_parse_from(["aiagent", "users", "delete", "alice"])
            .expect("parse users delete");
        assert!(matches!(
            cli.command,
            Commands::Resource(ResourceCommand::Users(UserCommand::Delete { ref username }))
                if username == "alice"
        ));

        let cli = AiAgentCli::try_parse_from(["aiagent", "dashboard"]).expect("parse dashboard");
        assert!(matches!(
            cli.command,
            Commands::Resource(ResourceCommand::Dashboard)
        ));
    }
}
