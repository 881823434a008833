use std::path::PathBuf;

use bench_log::BenchLog;
use clap::{Args, Parser, Subcommand};
use common::{config::Settings, plot::Plot, util::DEFAULT_KERNEL_SIZE};
use eyre::Result;
use string_length::StringLength;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod run;

const MODULES: &[&str] = &["common", "bench_log", "string_length"];

#[derive(Parser)]
#[command(version, about = "Plot benchmark result files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Image to write, `.svg` for svg output, png otherwise
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Do not open the plot once written
    #[arg(long, default_value_t = false)]
    no_show: bool,
    /// Also dump the plotted series as json
    #[arg(long, default_value_t = false)]
    plot_data: bool,
}

impl OutputArgs {
    fn settings(&self) -> Settings {
        Settings {
            show: !self.no_show,
            plot_data: self.plot_data,
            ..Settings::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Plot every section of a benchmark log on a log scale
    Log {
        /// Benchmark log, `item_count,time_ms` rows under section labels
        log_file: PathBuf,
        /// Y axis label
        y_label: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compare four string length benchmark tables
    StringLength {
        /// 20% prefix, List
        csv1: PathBuf,
        /// 50% prefix, List
        csv2: PathBuf,
        /// 20% prefix, HashMap
        csv3: PathBuf,
        /// 50% prefix, HashMap
        csv4: PathBuf,
        /// Median filter window for the time column
        #[arg(short, long, default_value_t = DEFAULT_KERNEL_SIZE)]
        kernel_size: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the plots listed in a config file
    Plot {
        #[arg(short, long, default_value = "config.yaml")]
        config_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("bench_plot={log_level}"));

    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    let result = match args.command {
        Commands::Log {
            log_file,
            y_label,
            output,
        } => {
            let plot: Box<dyn Plot> =
                Box::new(BenchLog::new(log_file, y_label, output.output.clone()));
            run::run_plots(&[plot], &output.settings())
        }
        Commands::StringLength {
            csv1,
            csv2,
            csv3,
            csv4,
            kernel_size,
            output,
        } => {
            let plot: Box<dyn Plot> = Box::new(StringLength::new(
                [csv1, csv2, csv3, csv4],
                kernel_size,
                output.output.clone(),
            ));
            run::run_plots(&[plot], &output.settings())
        }
        Commands::Plot { config_file } => run::run_config(&config_file),
    };

    if let Err(err) = &result {
        error!("{err:#?}");
    }
    result
}
