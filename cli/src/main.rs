use clap::{Parser, Subcommand, ValueEnum};
use emv::aid::Directory;
use emv::config::DEFAULT_MAX_ATTEMPTS;
use emv::dump::{AidTable, Dump};
use emv::pcsc::{Context, PcscCard};
use emv::{select, tags, track2, Card, Config, TlvDb};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("The card returned an error: {0}")]
    Card(#[from] emv::card::Error),

    #[error("Error occurred on communicating with PC/SC: {0}")]
    Pcsc(#[from] emv::pcsc::Error),

    #[error("Could not serialize the output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid hex string: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("No application found on the card")]
    NoApplication,

    #[error("Track 2 data has no PAN in it")]
    NoPan,
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Parser)]
#[command(name = "emv")]
#[command(about = "Search and select EMV payment applications on a card")]
#[command(version)]
struct Cli {
    /// Logs every APDU sent to and received from the card
    #[arg(long, global = true)]
    apdu_log: bool,

    /// Attempts made for each application before it is skipped
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the applications of the card
    Search {
        #[arg(short, long, value_enum, default_value_t = Method::Ppse)]
        method: Method,

        /// Dumps the reply of every selected application
        #[arg(short, long)]
        decode: bool,

        /// Keeps the field on after the search
        #[arg(short, long)]
        keep_field: bool,

        #[arg(long)]
        json: bool,
    },

    /// Selects the application with the highest priority
    Select {
        #[arg(short, long, value_enum, default_value_t = Method::Ppse)]
        method: Method,

        #[arg(long)]
        json: bool,
    },

    /// Selects the application with the highest priority, then asks it for a challenge
    Challenge {
        #[arg(short, long, value_enum, default_value_t = Method::Ppse)]
        method: Method,
    },

    /// Extracts the PAN and the dCVV input from Track 2 Equivalent Data
    Track2 {
        /// Value of the `57` record, in hex
        data: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Reads the directory of the contact PSE
    Pse,

    /// Reads the directory of the contactless PPSE
    Ppse,

    /// Tries every known AID
    Bruteforce,
}

fn discover(
    card: &mut Card<PcscCard>,
    method: Method,
    decode: bool,
    leave_field_on: bool,
) -> Result<TlvDb> {
    let mut tlv = TlvDb::new();

    let found = match method {
        Method::Pse => card.search_pse(true, leave_field_on, Directory::Pse, decode, &mut tlv)?,
        Method::Ppse => card.search_pse(true, leave_field_on, Directory::Ppse, decode, &mut tlv)?,
        Method::Bruteforce => card.search(true, leave_field_on, decode, &mut tlv)?,
    };

    info!("Found {} application(s)", found.len());

    Ok(tlv)
}

/// Waits for a card on the first PC/SC reader.
fn connect(config: Config) -> Result<Card<PcscCard>> {
    let ctx = Context::try_new()?;
    let device = ctx.open()?;

    Ok(Card::with_config(device.connect(&ctx)?, config))
}

/// Discovers the applications and selects the preferred one, leaving the field on.
fn select_preferred(card: &mut Card<PcscCard>, method: Method) -> Result<(Vec<u8>, TlvDb)> {
    let tlv = discover(card, method, false, true)?;
    let aid = match select::select_application(&tlv) {
        Some(aid) => aid,
        None => {
            card.drop_field();
            return Err(Error::NoApplication);
        }
    };

    let mut fci = TlvDb::new();
    card.select(false, true, &aid, Some(&mut fci))?;

    Ok((aid, fci))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config {
        apdu_logging: cli.apdu_log,
        max_attempts: cli.max_attempts,
    };

    match cli.command {
        Commands::Search {
            method,
            decode,
            keep_field,
            json,
        } => {
            let mut card = connect(config)?;
            let tlv = discover(&mut card, method, decode, keep_field)?;
            let table = AidTable::new(&tlv);

            if json {
                let output = serde_json::json!({
                    "applications": table.entries(),
                    "tlv": tlv,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print!("{}", table);
            }
        }
        Commands::Select { method, json } => {
            let mut card = connect(config)?;
            let (aid, fci) = select_preferred(&mut card, method)?;
            card.drop_field();

            if json {
                let output = serde_json::json!({
                    "aid": hex::encode_upper(&aid),
                    "fci": fci,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Selected {}", hex::encode_upper(&aid));
                print!("{}", Dump::new(&fci));
            }
        }
        Commands::Challenge { method } => {
            let mut card = connect(config)?;
            select_preferred(&mut card, method)?;
            let response = card.generate_challenge(false, None)?;

            println!("{}", hex::encode_upper(response.payload()));
        }
        // Track 2 data is given on the command line, no card needed.
        Commands::Track2 { data, json } => extract_track2(&data, json)?,
    }

    Ok(())
}

fn extract_track2(data: &str, json: bool) -> Result<()> {
    let track = TlvDb::fixed(tags::TRACK_2_EQUIVALENT_DATA, &hex::decode(data)?);
    let record = track.node(track.roots()[0]);

    let mut output = track2::extract_pan(record).ok_or(Error::NoPan)?;
    if let Some(dcvv) = track2::extract_dcvv_raw(record) {
        output.add(dcvv);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", Dump::new(&output));
    }

    Ok(())
}
