use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Evaluate declarative definitions and render their results.
#[derive(Parser, Debug)]
#[command(name = "tabula", version, about)]
pub struct CliArgs {
    /// Definitions directory (overrides DEFINITIONS_DIR)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the definitions found in the definitions directory
    List,

    /// Evaluate one definition and print its data set as JSON
    Eval {
        /// Definition id
        id: String,

        #[command(flatten)]
        bindings: BindingArgs,

        /// Compact single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Evaluate definitions and print a frequency chart of their values
    Chart {
        /// Definition ids; each contributes one data set
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        bindings: BindingArgs,

        /// Label order: sorted or insertion (overrides CHART_ORDER)
        #[arg(long)]
        order: Option<String>,

        /// Chart title (defaults to the last data set's name)
        #[arg(long)]
        title: Option<String>,

        /// Count only these columns (repeatable)
        #[arg(long = "column")]
        columns: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

/// Parameters, bindings and scope shared by `eval` and `chart`.
#[derive(Args, Debug, Default)]
pub struct BindingArgs {
    /// Global context parameter, `name=value` (repeatable)
    #[arg(long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Slot binding, `slot=value`, `slot=${name}` or `slot=@definition-id` (repeatable)
    #[arg(long = "map", value_name = "SLOT=BINDING")]
    pub maps: Vec<String>,

    /// Restrict evaluation to these subject ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub scope: Vec<i64>,

    /// Evaluation date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<chrono::NaiveDate>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Chart payload as JSON
    Json,
    /// `var chartData = [..];` and `labels: [..],` literals
    Script,
}
