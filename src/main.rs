//! CLI entry point for punchout-tester, a client for the punchout test tool backend.
//!
//! Each subcommand maps onto one tool of the web app: building and sending
//! OCI or cXML punchouts, reading returned carts, and inspecting supplier
//! sites.
//!
//! Exit codes:
//! - 0: success
//! - 1: runtime error (invalid URL, API error, missing cart, etc.)
//! - 2: argument validation error (clap handles this automatically)

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use punchout_tester::cart::{get_cxml_cart, get_oci_cart};
use punchout_tester::client::{BackendClient, DEFAULT_CONNECT_TIMEOUT};
use punchout_tester::config::{BACKEND_URL_ENV, Config};
use punchout_tester::cxml::SetupRequestForm;
use punchout_tester::error::{PunchoutError, Result};
use punchout_tester::inspect::{check_framing, check_headers};
use punchout_tester::oci::{OciField, ParamField};
use punchout_tester::render::{format_amount, pretty_json, render_table, render_tree};
use punchout_tester::roundtrip::{send_cxml_punchout, send_oci_roundtrip, visitor_count};
use punchout_tester::session::OciSession;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL. Overrides the configuration file.
    #[arg(long, global = true, env = BACKEND_URL_ENV)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an OCI punchout URL from a base URL and fields, optionally sending it.
    Oci(OciArgs),
    /// Build a cXML PunchOutSetupRequest, optionally sending it.
    Cxml(CxmlArgs),
    /// Show the OCI cart returned under a cart ID.
    OciCart {
        id: String,
    },
    /// Show the cXML cart returned under a document ID.
    CxmlCart {
        id: String,
        /// Print the raw order message.
        #[arg(long)]
        xml: bool,
        /// Print the parsed document as a tree expanded to this depth.
        #[arg(long, value_name = "DEPTH")]
        tree: Option<usize>,
    },
    /// Ask the backend to inspect a supplier site's headers.
    Headers {
        url: String,
        /// Print the report sections fully expanded.
        #[arg(long)]
        full: bool,
    },
    /// Check whether a supplier site can be embedded in an iframe.
    Frame {
        url: String,
    },
    /// Print the backend's visitor counter.
    Visitors,
}

#[derive(Args)]
struct OciArgs {
    /// Supplier punchout URL; its query is split into the fields below.
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Where the supplier posts the cart back.
    #[arg(long)]
    hook_url: Option<String>,

    /// Custom query parameter as KEY=VALUE. Repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    params: Vec<(String, String)>,

    /// Print the structured configuration as JSON.
    #[arg(long)]
    json: bool,

    /// Start the punchout through the backend.
    #[arg(long)]
    send: bool,
}

#[derive(Args)]
struct CxmlArgs {
    /// Read the form from a pasted setup request document.
    #[arg(long, value_name = "FILE")]
    paste: Option<PathBuf>,

    #[command(flatten)]
    fields: CxmlFields,

    /// Print the generated payload.
    #[arg(long)]
    print: bool,

    /// Send the payload to the supplier through the backend.
    #[arg(long)]
    send: bool,

    /// Session ID header for the send. Defaults to the configured one, or a new UUID.
    #[arg(long)]
    session_id: Option<String>,
}

/// Form overrides applied after defaults or a pasted document.
#[derive(Args)]
struct CxmlFields {
    #[arg(long)]
    supplier_url: Option<String>,
    #[arg(long)]
    from_domain: Option<String>,
    #[arg(long)]
    from_identity: Option<String>,
    #[arg(long)]
    to_domain: Option<String>,
    #[arg(long)]
    to_identity: Option<String>,
    #[arg(long)]
    sender_domain: Option<String>,
    #[arg(long)]
    sender_identity: Option<String>,
    #[arg(long)]
    shared_secret: Option<String>,
    #[arg(long)]
    extrinsic_user: Option<String>,
    #[arg(long)]
    extrinsic_username: Option<String>,
    #[arg(long)]
    extrinsic_email: Option<String>,
}

impl CxmlFields {
    fn apply(&self, form: &mut SetupRequestForm) {
        let overrides = [
            (&self.supplier_url, &mut form.supplier_url),
            (&self.from_domain, &mut form.from_domain),
            (&self.from_identity, &mut form.from_identity),
            (&self.to_domain, &mut form.to_domain),
            (&self.to_identity, &mut form.to_identity),
            (&self.sender_domain, &mut form.sender_domain),
            (&self.sender_identity, &mut form.sender_identity),
            (&self.shared_secret, &mut form.shared_secret),
            (&self.extrinsic_user, &mut form.extrinsic_user),
            (&self.extrinsic_username, &mut form.extrinsic_username),
            (&self.extrinsic_email, &mut form.extrinsic_email),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
    }
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_backend_override(cli.backend);
    log::debug!("backend: {}", config.backend_url);
    let client = BackendClient::with_timeouts(
        &config.backend_url,
        DEFAULT_CONNECT_TIMEOUT,
        config.request_timeout,
    )?;

    match cli.command {
        Command::Oci(args) => run_oci(&client, &config, args).await,
        Command::Cxml(args) => run_cxml(&client, &config, args).await,
        Command::OciCart { id } => {
            let Some(cart) = get_oci_cart(&client, &id).await? else {
                eprintln!("No cart data stored under {id}");
                return Ok(ExitCode::FAILURE);
            };
            println!("{}", render_table(&cart.headers(), &cart.rows()));
            println!();
            println!("Items: {}", cart.item_count());
            println!("Total: {}", format_amount(cart.total(), cart.currency()));
            Ok(ExitCode::SUCCESS)
        }
        Command::CxmlCart { id, xml, tree } => {
            let Some(cart) = get_cxml_cart(&client, &id).await? else {
                eprintln!("No cart data stored under {id}");
                return Ok(ExitCode::FAILURE);
            };
            let summary = &cart.summary;
            println!("Payload ID: {}", summary.payload_id);
            println!("Timestamp:  {}", summary.timestamp);
            println!("From:       {} ({})", summary.supplier_identity, summary.supplier_domain);
            println!("To:         {} ({})", summary.buyer_identity, summary.buyer_domain);
            println!("Sender:     {} [{}]", summary.sender_identity, summary.user_agent);
            println!();

            let headers: Vec<String> = ["Part ID", "Description", "Qty", "UoM", "Unit price", "Class"]
                .into_iter()
                .map(String::from)
                .collect();
            let rows: Vec<Vec<String>> = summary
                .items
                .iter()
                .map(|item| {
                    vec![
                        item.supplier_part_id.clone(),
                        item.description.clone(),
                        item.quantity.to_string(),
                        item.unit_of_measure.clone(),
                        format_amount(item.unit_price, None),
                        item.classification.clone(),
                    ]
                })
                .collect();
            println!("{}", render_table(&headers, &rows));
            println!();
            println!("Total: {}", format_amount(summary.total(), Some(summary.currency.as_str())));

            if xml {
                println!();
                println!("{}", cart.xml);
            }
            if let Some(depth) = tree {
                println!();
                println!("{}", render_tree(&cart.tree, depth));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Headers { url, full } => {
            let report = check_headers(&client, &url).await?;
            let depth = if full { usize::MAX } else { 1 };
            let sections = [
                ("HTTP headers", &report.http_headers),
                ("SSL/TLS", &report.ssl_tls_info),
                ("CORS", &report.cors_info.status),
                ("Mixed content", &report.mixed_content),
                ("SameSite cookies", &report.same_site_cookies),
                ("X-Frame-Options", &report.x_frame_options),
            ];
            for (title, value) in sections {
                println!("== {title} ==");
                println!("{}", render_tree(value, depth));
                println!();
            }

            println!("== Iframes ==");
            if report.iframes.is_empty() {
                println!("none");
            } else {
                let headers: Vec<String> = ["Source", "Secure", "Width", "Height", "Frameborder"]
                    .into_iter()
                    .map(String::from)
                    .collect();
                let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
                let rows: Vec<Vec<String>> = report
                    .iframes
                    .iter()
                    .map(|frame| {
                        vec![
                            frame.src.clone(),
                            if frame.is_secure { "yes" } else { "no" }.to_string(),
                            na(&frame.attributes.width),
                            na(&frame.attributes.height),
                            na(&frame.attributes.frameborder),
                        ]
                    })
                    .collect();
                println!("{}", render_table(&headers, &rows));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Frame { url } => {
            let verdict = check_framing(&client, &url).await?;
            println!("Origin:          {}", verdict.origin);
            println!(
                "X-Frame-Options: {}",
                verdict.x_frame_options.as_deref().unwrap_or("not set")
            );
            println!(
                "frame-ancestors: {}",
                verdict.frame_ancestors.as_deref().unwrap_or("not set")
            );
            println!(
                "Embeddable:      {}",
                if verdict.embeddable { "yes" } else { "no" }
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Visitors => {
            println!("{}", visitor_count(&client).await?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_oci(client: &BackendClient, config: &Config, args: OciArgs) -> Result<ExitCode> {
    let session = OciSession::new(config.timing);

    if let Some(url) = &args.url {
        session.set_field(OciField::BaseUrl, url);
        session.flush();
    }
    let fields = [
        (OciField::Username, &args.username),
        (OciField::Password, &args.password),
        (OciField::HookUrl, &args.hook_url),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            session.set_field(field, value);
        }
    }
    for (key, value) in &args.params {
        let rows = session.snapshot().custom_params;
        let index = match rows.iter().position(|row| row.is_blank()) {
            Some(index) => index,
            None => {
                session.add_custom_param();
                rows.len()
            }
        };
        session.set_custom_param(index, ParamField::Key, key);
        session.set_custom_param(index, ParamField::Value, value);
    }
    session.flush();

    if let Some(message) = session.error() {
        return Err(PunchoutError::invalid_url(message));
    }
    let oci = session.close();
    println!("{}", oci.base_url);
    if args.json {
        println!("{}", pretty_json(&serde_json::to_value(&oci)?));
    }

    if args.send {
        let supplier_url = send_oci_roundtrip(client, &oci).await?;
        println!("Punchout session: {supplier_url}");
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_cxml(client: &BackendClient, config: &Config, args: CxmlArgs) -> Result<ExitCode> {
    let mut form = match &args.paste {
        Some(path) => {
            let pasted = std::fs::read_to_string(path).map_err(|e| {
                PunchoutError::Validation(format!("cannot read {}: {e}", path.display()))
            })?;
            let buyer_url = SetupRequestForm::new(client.base_url()).buyer_url;
            SetupRequestForm::parse_pasted(&pasted, &buyer_url)?
        }
        None => SetupRequestForm::new(client.base_url()),
    };
    args.fields.apply(&mut form);
    let payload = form.to_payload();

    if args.print || !args.send {
        println!("{payload}");
    }
    if args.send {
        let session_id = args
            .session_id
            .or_else(|| config.session_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let start_page = send_cxml_punchout(client, &form, &payload, &session_id).await?;
        println!("Punchout session: {start_page}");
    }
    Ok(ExitCode::SUCCESS)
}
