//! `coursecat` - CLI and web server for the course catalog
//!
//! This binary runs the HTTP service and offers a few read-only commands for
//! inspecting the catalog file and the configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use coursecat::cli::{Cli, Command, ConfigCommand, ServeCommand};
use coursecat::logging::LogFormat;
use coursecat::{init_logging, web, AppState, CatalogService, Config, Course, JsonFileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Initialize logging based on verbosity
    init_logging(
        cli.verbosity(),
        LogFormat::from_json_flag(config.telemetry.json_logs),
    );

    let store = Arc::new(JsonFileStore::new(config.catalog_path()));

    // Execute the command
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(&config, store, serve_cmd).await,
        Command::List(list_cmd) => handle_list(store, list_cmd.json).await,
        Command::Show(show_cmd) => handle_show(store, &show_cmd.code, show_cmd.json).await,
        Command::Status(status_cmd) => handle_status(&config, &store, status_cmd.json).await,
        Command::Config(config_cmd) => handle_config(&config, cli.config, config_cmd),
    }
}

async fn handle_serve(
    config: &Config,
    store: Arc<JsonFileStore>,
    cmd: ServeCommand,
) -> anyhow::Result<()> {
    let bind = match cmd.bind {
        Some(bind) => bind,
        None => config.bind_addr()?.to_string(),
    };
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(catalog = %store.path().display(), "serving course catalog");
    let state = AppState::new(CatalogService::new(store), config);
    web::serve(listener, state, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

async fn handle_list(store: Arc<JsonFileStore>, json: bool) -> anyhow::Result<()> {
    let courses = CatalogService::new(store).list().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&courses)?);
        return Ok(());
    }

    if courses.is_empty() {
        println!("No courses yet.");
        return Ok(());
    }
    for course in &courses {
        println!("{course}");
    }
    println!();
    println!("Total courses: {}", courses.len());
    Ok(())
}

async fn handle_show(store: Arc<JsonFileStore>, code: &str, json: bool) -> anyhow::Result<()> {
    let Some(course) = CatalogService::new(store).find_by_code(code).await? else {
        bail!("No course found with code '{code}'.");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&course)?);
    } else {
        print_course(&course);
    }
    Ok(())
}

fn print_course(course: &Course) {
    println!("{course}");
    println!("{}", "-".repeat(course.to_string().chars().count()));
    println!("Instructor:    {}", course.instructor);
    println!("Semester:      {}", course.semester);
    println!("Schedule:      {}", course.schedule);
    println!("Classroom:     {}", course.classroom);
    println!("Prerequisites: {}", course.prerequisites);
    println!("Grading:       {}", course.grading);
    if course.has_description() {
        println!();
        println!("{}", course.description);
    }
}

async fn handle_status(
    config: &Config,
    store: &JsonFileStore,
    json: bool,
) -> anyhow::Result<()> {
    let stats = store.stats().await?;
    if json {
        let status = serde_json::json!({
            "catalog_path": store.path(),
            "bind": config.server.bind,
            "service_name": config.telemetry.service_name,
            "catalog": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("coursecat status");
        println!("----------------");
        println!("Catalog:       {}", store.path().display());
        println!("Exists:        {}", stats.exists);
        println!("Courses:       {}", stats.total_courses);
        println!("Size (bytes):  {}", stats.file_size_bytes);
        match stats.last_modified {
            Some(when) => println!("Last modified: {}", when.to_rfc3339()),
            None => println!("Last modified: never"),
        }
        println!("Bind:          {}", config.server.bind);
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    custom_path: Option<std::path::PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
                println!("  Secret key:         (set)");
                println!();
                println!("[Storage]");
                println!("  Catalog path:       {}", config.catalog_path().display());
                println!();
                println!("[Telemetry]");
                println!("  Service name:       {}", config.telemetry.service_name);
                println!("  JSON logs:          {}", config.telemetry.json_logs);
            }
        }
        ConfigCommand::Path => {
            let path = custom_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(custom_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
