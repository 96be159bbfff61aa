//! Sample Transaction Generator
//!
//! Writes a synthetic transaction file for exercising the fraud screen:
//! ordinary traffic plus suspicious bursts, noisy timestamps and the odd
//! comment or malformed line.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::Rng;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "sample-generator")]
#[command(about = "Generate a synthetic transaction file", long_about = None)]
struct Args {
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of ordinary transactions
    #[arg(short, long, default_value_t = 200)]
    count: u64,

    /// Number of cards the traffic is spread over
    #[arg(long, default_value_t = 20)]
    cards: u32,

    /// Probability that an ordinary transaction is followed by a suspicious burst
    #[arg(long, default_value_t = 0.05)]
    fraud_rate: f64,

    /// Probability of a malformed line
    #[arg(long, default_value_t = 0.01)]
    noise_rate: f64,
}

/// Transaction line generator
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    cards: Vec<String>,
    clock_ms: i64,
}

impl TransactionGenerator {
    fn new(card_count: u32) -> Self {
        let mut rng = rand::thread_rng();
        let cards = (0..card_count.max(1))
            .map(|_| format!("4{:015}", rng.gen_range(0..1_000_000_000_000_000u64)))
            .collect();

        Self {
            rng,
            cards,
            clock_ms: Utc::now().timestamp_millis(),
        }
    }

    fn random_card(&mut self) -> String {
        self.cards[self.rng.gen_range(0..self.cards.len())].clone()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }

    /// Timestamp field, sometimes with separator noise the parser strips
    fn timestamp_field(&mut self, millis: i64) -> String {
        if self.rng.gen_bool(0.1) {
            format!("{}ms", millis)
        } else {
            millis.to_string()
        }
    }

    fn line(&mut self, card: &str, location: &str, amount: f64, millis: i64) -> String {
        let ts = self.timestamp_field(millis);
        format!("{},{},{:.2},{}", card, location, amount, ts)
    }

    /// One ordinary transaction, minutes after the previous one
    fn generate_legitimate(&mut self) -> String {
        self.clock_ms += self.rng.gen_range(60_000..900_000);
        let card = self.random_card();
        let location = self.random_choice(&["NYC", "LA", "Chicago", "Boston", "Seattle"]);
        let amount = self.rng.gen_range(5.0..300.0);
        self.line(&card, location, amount, self.clock_ms)
    }

    /// Either one very large purchase or a rapid-fire run on a single card
    fn generate_suspicious(&mut self) -> Vec<String> {
        let card = self.random_card();
        let location = self.random_choice(&["Lagos", "Minsk", "Online", "Unknown"]);

        if self.rng.gen_bool(0.5) {
            self.clock_ms += self.rng.gen_range(1_000..60_000);
            let amount = self.rng.gen_range(5_000.0..20_000.0);
            vec![self.line(&card, location, amount, self.clock_ms)]
        } else {
            let burst = self.rng.gen_range(5..9);
            (0..burst)
                .map(|_| {
                    self.clock_ms += self.rng.gen_range(1_000..10_000);
                    let amount = self.rng.gen_range(20.0..400.0);
                    self.line(&card, location, amount, self.clock_ms)
                })
                .collect()
        }
    }

    fn generate_malformed(&mut self) -> String {
        let card = self.random_card();
        match self.rng.gen_range(0..3) {
            0 => format!("{},NYC,not-a-number,{}", card, self.clock_ms),
            1 => format!("{},NYC", card),
            _ => format!("{},NYC,12.00,unknown", card),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_generator=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    info!(
        count = args.count,
        cards = args.cards,
        fraud_rate = args.fraud_rate,
        noise_rate = args.noise_rate,
        "Generating transactions"
    );

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut generator = TransactionGenerator::new(args.cards);
    let mut rng = rand::thread_rng();
    let mut legitimate_count = 0u64;
    let mut suspicious_count = 0u64;
    let mut malformed_count = 0u64;

    writeln!(out, "# cardNumber,location,amount,timestamp")?;

    for _ in 0..args.count {
        writeln!(out, "{}", generator.generate_legitimate())?;
        legitimate_count += 1;

        if rng.gen_bool(args.fraud_rate.clamp(0.0, 1.0)) {
            for line in generator.generate_suspicious() {
                writeln!(out, "{}", line)?;
                suspicious_count += 1;
            }
        }

        if rng.gen_bool(args.noise_rate.clamp(0.0, 1.0)) {
            writeln!(out, "{}", generator.generate_malformed())?;
            malformed_count += 1;
        }
    }

    out.flush()?;

    info!(
        "Completed! Wrote {} legitimate, {} suspicious and {} malformed lines",
        legitimate_count, suspicious_count, malformed_count
    );

    Ok(())
}
