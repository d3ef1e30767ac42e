//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use psy_batch::Selection;
use psy_openai::constants::{BATCH_LIST_LIMIT, DEFAULT_TIMEOUT_SECS, FINE_TUNE_LIST_LIMIT};
use std::path::PathBuf;

/// Top-level CLI parser for `gpt`.
#[derive(Debug, Parser)]
#[command(
    name = "gpt",
    version,
    about = "gpt: OpenAI GPT Command Line Tool",
    long_about = "gpt is a command line tool for working with OpenAI GPT models"
)]
pub struct Cli {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// OpenAI organization ID
    #[arg(long, env = "OPENAI_ORG_ID", global = true)]
    pub org_id: Option<String>,

    /// API base URL
    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout: u64,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print application information
    About,
    /// Manage models
    Model(ModelArgs),
    /// Manage files
    File(FileArgs),
    /// Manage batch operations
    Batch(BatchArgs),
    /// Manage fine-tuning jobs
    Tune(TuneArgs),
    /// Complete chat prompts, one at a time or over an answer file
    Chat(ChatArgs),
}

/// `gpt model`
#[derive(Debug, Args)]
pub struct ModelArgs {
    /// Print the raw OpenAI response
    #[arg(short, long, global = true)]
    pub raw: bool,

    /// Model subcommand
    #[command(subcommand)]
    pub command: ModelCommand,
}

/// Model subcommands.
#[derive(Debug, Subcommand)]
pub enum ModelCommand {
    /// List models
    List {
        /// Print full JSON instead of IDs
        #[arg(short, long)]
        full: bool,
    },
    /// Read specified model(s)
    Read {
        /// Model IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete specified fine-tuned model(s)
    Delete {
        /// Model IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// `gpt file`
#[derive(Debug, Args)]
pub struct FileArgs {
    /// Print the raw OpenAI response
    #[arg(short, long, global = true)]
    pub raw: bool,

    /// File subcommand
    #[command(subcommand)]
    pub command: FileCommand,
}

/// File subcommands.
#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// List files
    List {
        /// Only files with this purpose
        #[arg(short, long)]
        purpose: Option<String>,
        /// Print full JSON instead of one line per file
        #[arg(short, long)]
        full: bool,
    },
    /// Read specified file(s)
    Read {
        /// File IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Upload a JSONL file
    Upload {
        /// Local file
        path: PathBuf,
        /// File purpose
        #[arg(short, long, default_value = "fine-tune")]
        purpose: String,
    },
    /// Download a file
    Download {
        /// File ID
        id: String,
        /// Output path; defaults to the uploaded file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete specified file(s)
    Delete {
        /// File IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// `gpt batch`
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Print the raw OpenAI response
    #[arg(short, long, global = true)]
    pub raw: bool,

    /// Batch subcommand
    #[command(subcommand)]
    pub command: BatchCommand,
}

/// Batch subcommands.
#[derive(Debug, Subcommand)]
pub enum BatchCommand {
    /// Create a new batch operation from an uploaded batch file
    Create {
        /// Input file ID
        input_file_id: String,
    },
    /// Read specified batch operation(s)
    Read {
        /// Batch IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Monitor a batch operation until it is done
    Monitor {
        /// Batch ID
        id: String,
        /// Polling interval in seconds
        #[arg(short, long, default_value_t = 10)]
        wait: u64,
    },
    /// Cancel specified batch operation(s)
    Cancel {
        /// Batch IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List batch operations
    List {
        /// Page size
        #[arg(short, long, default_value_t = BATCH_LIST_LIMIT)]
        limit: u32,
        /// Cursor: the last ID received
        #[arg(short, long)]
        after: Option<String>,
        /// Print full JSON instead of progress lines
        #[arg(short, long)]
        full: bool,
    },
}

/// `gpt tune`
#[derive(Debug, Args)]
pub struct TuneArgs {
    /// Print the raw OpenAI response
    #[arg(short, long, global = true)]
    pub raw: bool,

    /// Fine-tuning subcommand
    #[command(subcommand)]
    pub command: TuneCommand,
}

/// Fine-tuning subcommands.
#[derive(Debug, Subcommand)]
pub enum TuneCommand {
    /// Create a fine-tuning job
    Create {
        /// Training file ID
        training_file: String,
        /// Validation file ID
        validation_file: Option<String>,
        /// Base model
        #[arg(short, long, default_value = "gpt-4o-mini")]
        base: String,
        /// Name suffix of the fine-tuned model
        #[arg(short, long)]
        suffix: Option<String>,
    },
    /// List fine-tuning jobs
    List {
        /// Page size
        #[arg(short, long, default_value_t = FINE_TUNE_LIST_LIMIT)]
        limit: u32,
        /// Cursor: the last ID received
        #[arg(short, long)]
        after: Option<String>,
        /// Print full JSON instead of one line per job
        #[arg(short, long)]
        full: bool,
    },
    /// Read specified fine-tuning job(s)
    Read {
        /// Job IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List events for a fine-tuning job
    Events {
        /// Job ID
        id: String,
        /// Page size
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
        /// Print full JSON instead of one line per event
        #[arg(short, long)]
        full: bool,
    },
    /// Cancel specified fine-tuning job(s)
    Cancel {
        /// Job IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// `gpt chat`
#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Sampling options shared by every chat subcommand
    #[command(flatten)]
    pub sampling: Sampling,

    /// Chat subcommand
    #[command(subcommand)]
    pub command: ChatCommand,
}

/// Model and sampling options.
#[derive(Debug, Clone, Args)]
pub struct Sampling {
    /// Model ID
    #[arg(short, long, default_value = "gpt-4o", global = true)]
    pub model: String,

    /// Temperature for sampling
    #[arg(short = 'T', long, default_value_t = 0.5, global = true)]
    pub temperature: f32,

    /// Maximum number of tokens to generate (0 for no limit)
    #[arg(short = 't', long, default_value_t = 0, global = true)]
    pub max_tokens: u32,
}

/// Files for a templated run, in positional order.
#[derive(Debug, Clone, Args)]
pub struct RunFiles {
    /// Result CSV file
    pub output_file: String,
    /// Prompt template file
    pub prompt_file: String,
    /// System message file ("" for none)
    pub system_file: String,
    /// Answer CSV file
    pub answer_file: String,
    /// Question CSV file
    pub question_file: Option<String>,
}

/// Answer and question column options.
#[derive(Debug, Clone, Args)]
pub struct Fields {
    /// Answer field name
    #[arg(short = 'a', long, required = true)]
    pub answer_field: String,

    /// Question field name
    #[arg(short = 'q', long, default_value = "")]
    pub question_field: String,

    /// Question ID: a shared key column (name), or one question row (name=value)
    #[arg(short = 'Q', long, default_value = "")]
    pub question_id: String,
}

/// Score column options.
#[derive(Debug, Clone, Args)]
pub struct Scoring {
    /// Score field name
    #[arg(short = 's', long, default_value = "score")]
    pub score_field: String,

    /// Score selection: first | last | all | none
    #[arg(short = 'S', long, default_value = "last")]
    pub score_select: Selection,
}

/// Chat subcommands.
#[derive(Debug, Subcommand)]
pub enum ChatCommand {
    /// Chat complete a test prompt
    Prompt {
        /// Prompt file
        prompt_file: String,
        /// System message file
        system_file: Option<String>,
        /// Score selection: first | last | all | none
        #[arg(short = 'S', long, default_value = "none")]
        score_select: Selection,
        /// Print the request and the raw OpenAI response
        #[arg(short, long)]
        raw: bool,
        /// Print the completed chat as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Chat complete a random (or selected) answer
    Random {
        /// Prompt template file
        prompt_file: String,
        /// System message file ("" for none)
        system_file: String,
        /// Answer CSV file
        answer_file: String,
        /// Question CSV file
        question_file: Option<String>,
        /// Column options
        #[command(flatten)]
        fields: Fields,
        /// Answer ID: "random" or name=value
        #[arg(short = 'A', long, default_value = "random")]
        answer_id: String,
        /// Score selection: first | last | all | none
        #[arg(short = 'S', long, default_value = "last")]
        score_select: Selection,
        /// Print the request and the raw OpenAI response
        #[arg(short, long)]
        raw: bool,
        /// Print the completed chat as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Chat complete answers in parallel
    Parallel {
        /// Run files
        #[command(flatten)]
        files: RunFiles,
        /// Column options
        #[command(flatten)]
        fields: Fields,
        /// Score options
        #[command(flatten)]
        scoring: Scoring,
        /// Concurrent request batch size
        #[arg(short, long, default_value_t = 20)]
        batch_size: usize,
    },
    /// Chat complete answers as an asynchronous batch
    Batch {
        /// Run files
        #[command(flatten)]
        files: RunFiles,
        /// Column options
        #[command(flatten)]
        fields: Fields,
        /// Score options
        #[command(flatten)]
        scoring: Scoring,
        /// Poll for results every this many seconds (0 to exit after submitting)
        #[arg(short, long, default_value_t = 0)]
        wait: u64,
        /// Write the JSONL input file only
        #[arg(short, long)]
        input_only: bool,
    },
    /// Process the results of a finished batch
    Results {
        /// Batch ID
        batch_id: String,
    },
}
