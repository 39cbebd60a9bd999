//! pdf2json CLI - PDF text reconstruction and LLM-backed JSON conversion

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdf2json::pipeline::{default_json_path, default_text_path};
use pdf2json::{
    Document, ErrorMode, ExtractOptions, GroqClient, JsonFormat, LlmConfig, PageSelection,
    PdfExtractor, DEFAULT_THRESHOLD,
};

#[derive(Parser)]
#[command(name = "pdf2json")]
#[command(version)]
#[command(about = "Rebuild reading-order text from PDFs and convert it to JSON", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output JSON file
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command that reads a PDF.
#[derive(Args, Clone)]
struct ExtractArgs {
    /// Maximum vertical distance for fragments on the same line
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Treat pages that cannot be decoded as empty instead of failing
    #[arg(long)]
    lenient: bool,
}

impl ExtractArgs {
    fn to_options(&self) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
        let pages = match self.pages.as_deref() {
            Some(p) => PageSelection::parse(p)?,
            None => PageSelection::All,
        };
        let error_mode = if self.lenient {
            ErrorMode::Lenient
        } else {
            ErrorMode::Strict
        };
        Ok(ExtractOptions::new()
            .with_threshold(self.threshold)
            .with_error_mode(error_mode)
            .with_pages(pages))
    }
}

/// Chat-completion settings.
#[derive(Args, Clone)]
struct LlmArgs {
    /// API key for the completion endpoint
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Model used for the JSON conversion
    #[arg(long, env = "GROQ_MODEL", global = true)]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "GROQ_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Maximum tokens in the model's answer
    #[arg(long, global = true)]
    max_tokens: Option<u32>,
}

impl LlmArgs {
    fn to_config(&self) -> pdf2json::Result<LlmConfig> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(pdf2json::Error::MissingApiKey(pdf2json::llm::API_KEY_VAR))?;

        let mut config = LlmConfig::new(api_key);
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert PDF to JSON through the LLM (default)
    Json {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output JSON file (defaults to <FILE>.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep the intermediate text file
        #[arg(long)]
        keep_text: bool,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Convert PDF to reading-order plain text
    Text {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <FILE>.txt, "-" for stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Dump reconstructed lines with their positions as JSON
    Lines {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Json {
            input,
            output,
            keep_text,
            extract,
        }) => cmd_json(&input, output.as_deref(), keep_text, &extract, &cli.llm),
        Some(Commands::Text {
            input,
            output,
            extract,
        }) => cmd_text(&input, output.as_deref(), &extract),
        Some(Commands::Lines {
            input,
            output,
            compact,
            extract,
        }) => cmd_lines(&input, output.as_deref(), compact, &extract),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            if let Some(input) = cli.input {
                let extract = ExtractArgs {
                    threshold: DEFAULT_THRESHOLD,
                    pages: None,
                    lenient: false,
                };
                cmd_json(&input, cli.output.as_deref(), false, &extract, &cli.llm)
            } else {
                println!("{}", "Usage: pdf2json <FILE> [OUTPUT]".yellow());
                println!("       pdf2json --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Extract the selected pages one by one behind a progress bar.
fn extract_with_progress(
    input: &Path,
    options: ExtractOptions,
) -> Result<Document, Box<dyn std::error::Error>> {
    let extractor = PdfExtractor::open_with_options(input, options)?;
    let page_numbers = extractor.page_numbers();

    let pb = ProgressBar::new(page_numbers.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut document = Document::new();
    document.metadata = extractor.metadata();
    for page_num in page_numbers {
        pb.set_message(format!("page {}", page_num));
        document.add_page(extractor.extract_page(page_num)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(document)
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    keep_text: bool,
    extract: &ExtractArgs,
    llm: &LlmArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    // Check the key before spending time on extraction.
    let client = GroqClient::new(llm.to_config()?)?;
    let json_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_json_path(input));

    println!("{} {}", "Converting PDF:".cyan(), input.display());
    println!("{} {}", "Processing text with".cyan(), client.config().model);

    let mut stdout = io::stdout();
    let conversion = pdf2json::convert_pdf_to_json(
        input,
        &json_path,
        keep_text,
        &client,
        extract.to_options()?,
        &mut stdout,
    )?;
    println!();

    if let Some(text_path) = &conversion.text_path {
        println!("{} {}", "Text kept at".green(), text_path.display());
    }
    println!(
        "{} {}",
        "Conversion complete! JSON saved to".green().bold(),
        conversion.json_path.display()
    );

    Ok(())
}

fn cmd_text(
    input: &Path,
    output: Option<&Path>,
    extract: &ExtractArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let document = extract_with_progress(input, extract.to_options()?)?;
    let text = pdf2json::render::to_text(&document);

    match output {
        Some(path) if path == Path::new("-") => println!("{}", text),
        _ => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| default_text_path(input));
            fs::write(&path, &text)?;
            println!("{} {}", "Saved to".green(), path.display());
        }
    }

    Ok(())
}

fn cmd_lines(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    extract: &ExtractArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let document = extract_with_progress(input, extract.to_options()?)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = pdf2json::to_json(&document, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let options = ExtractOptions::new().lenient();
    let extractor = PdfExtractor::open_with_options(input, options)?;
    let metadata = extractor.metadata();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), metadata.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if metadata.encrypted { "Yes" } else { "No" }
    );
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut fragments = 0;
    let mut lines = 0;
    let mut empty_pages = 0;
    for page_num in extractor.page_numbers() {
        let page = extractor.extract_page(page_num)?;
        fragments += page.fragment_count();
        lines += page.lines.len();
        if page.is_empty() {
            empty_pages += 1;
        }
    }

    println!("{}: {}", "Fragments".bold(), fragments);
    println!("{}: {}", "Lines".bold(), lines);
    println!("{}: {}", "Empty pages".bold(), empty_pages);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdf2json".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Reading-order PDF text and LLM-structured JSON");
}
