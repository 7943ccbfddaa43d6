use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Result, WrapErr};
use std::net::SocketAddr;
use std::path::PathBuf;

use pneumoguard::server::{ServerConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};

#[derive(Parser)]
#[command(
    name = "pneumoguard",
    version,
    about = "Chest X-ray pneumonia screening service and model tools."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP inference service
    Serve {
        /// Full address to bind to (overrides --port)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Port to listen on, on all interfaces
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Path to the ONNX image classifier
        #[arg(
            long,
            env = "PNEUMOGUARD_MODEL",
            default_value = pneumoguard::model::DEFAULT_MODEL_PATH
        )]
        model: PathBuf,

        /// Maximum request body size in bytes
        #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
        max_body_bytes: usize,
    },

    /// Score one feature vector with a tabular classifier (prints JSON)
    Predict {
        /// Path to the ONNX tabular classifier
        #[arg(long, default_value = pneumoguard::tabular::DEFAULT_MODEL_PATH)]
        model: PathBuf,

        /// JSON file holding the feature vector
        #[arg(long, default_value = pneumoguard::tabular::DEFAULT_INPUT_PATH)]
        input: PathBuf,
    },

    /// Print a model's inputs, outputs and content hash
    Inspect {
        /// Path to the ONNX model
        #[arg(long)]
        model: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn serve_config(
    bind: Option<SocketAddr>,
    port: u16,
    model: PathBuf,
    max_body_bytes: usize,
) -> ServerConfig {
    ServerConfig {
        bind_addr: bind.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], port))),
        model_path: model,
        max_body_bytes,
    }
}

fn cmd_serve(config: ServerConfig) -> Result<()> {
    tracing::info!(?config, "starting PneumoGuard inference service");
    let rt = tokio::runtime::Runtime::new().wrap_err("failed to start tokio runtime")?;
    rt.block_on(pneumoguard::server::run_server(config))
}

/// Always prints exactly one JSON object; the exit code carries success.
fn cmd_predict(model: PathBuf, input: PathBuf) -> i32 {
    match pneumoguard::tabular::run(&model, &input) {
        Ok(prediction) => {
            println!("{}", serde_json::json!(prediction));
            0
        }
        Err(e) => {
            tracing::debug!(error = ?e, "tabular prediction failed");
            println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            1
        }
    }
}

fn cmd_inspect(model: PathBuf, format: OutputFormat) -> Result<()> {
    let summary = pneumoguard::inspect::summarize(&model)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print!("{}", summary.render_text()),
    }
    Ok(())
}

fn init_tracing() {
    // stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Serve {
            bind,
            port,
            model,
            max_body_bytes,
        } => cmd_serve(serve_config(bind, port, model, max_body_bytes)),
        Commands::Predict { model, input } => std::process::exit(cmd_predict(model, input)),
        Commands::Inspect { model, format } => cmd_inspect(model, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse_serve(args: &[&str]) -> ServerConfig {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Serve {
                bind,
                port,
                model,
                max_body_bytes,
            } => serve_config(bind, port, model, max_body_bytes),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    #[serial]
    fn test_serve_defaults() {
        std::env::remove_var("PORT");
        std::env::remove_var("PNEUMOGUARD_MODEL");
        let config = parse_serve(&["pneumoguard", "serve"]);
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.model_path, PathBuf::from("pneumonia_detection_model.onnx"));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    #[serial]
    fn test_serve_reads_port_and_model_from_env() {
        std::env::set_var("PORT", "9123");
        std::env::set_var("PNEUMOGUARD_MODEL", "/models/xray.onnx");
        let config = parse_serve(&["pneumoguard", "serve"]);
        std::env::remove_var("PORT");
        std::env::remove_var("PNEUMOGUARD_MODEL");

        assert_eq!(config.bind_addr.port(), 9123);
        assert_eq!(config.model_path, PathBuf::from("/models/xray.onnx"));
    }

    #[test]
    #[serial]
    fn test_bind_overrides_port() {
        std::env::remove_var("PORT");
        let config = parse_serve(&[
            "pneumoguard",
            "serve",
            "--port",
            "1",
            "--bind",
            "127.0.0.1:7000",
        ]);
        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn test_predict_defaults() {
        let cli = Cli::try_parse_from(["pneumoguard", "predict"]).unwrap();
        match cli.command {
            Commands::Predict { model, input } => {
                assert_eq!(model, PathBuf::from("ensemble_model.onnx"));
                assert_eq!(input, PathBuf::from("temp_input.json"));
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_inspect_requires_model() {
        assert!(Cli::try_parse_from(["pneumoguard", "inspect"]).is_err());
        let cli =
            Cli::try_parse_from(["pneumoguard", "inspect", "--model", "m.onnx", "--format", "json"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Inspect {
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_cmd_predict_exit_code_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, "[[0.2, 0.9]]").unwrap();
        let model =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/softmax_classifier.onnx");
        assert_eq!(cmd_predict(model, input), 0);
    }

    #[test]
    fn test_cmd_inspect_fixture() {
        let model =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mean_pixel.onnx");
        assert!(cmd_inspect(model.clone(), OutputFormat::Json).is_ok());
        assert!(cmd_inspect(model, OutputFormat::Text).is_ok());
    }

    #[test]
    fn test_cmd_predict_exit_code_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let code = cmd_predict(dir.path().join("m.onnx"), dir.path().join("in.json"));
        assert_eq!(code, 1);
    }
}
