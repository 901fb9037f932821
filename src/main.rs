use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use bpaf::Bpaf;
use rangefinder_core::Rangefinder;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::detection::{open_sensor, survey};

mod config;
mod detection;

#[derive(Clone, Debug, Bpaf)]
enum Command {
    /// List connected rangefinders and their serial numbers
    #[bpaf(command)]
    List,
    /// Print the serial number of the selected rangefinder
    #[bpaf(command)]
    Serial,
    /// Take distance readings in millimeters
    #[bpaf(command)]
    Measure {
        /// Number of readings to take, 0 to run until interrupted
        #[bpaf(short('n'), long, argument("COUNT"))]
        count: Option<u64>,
        /// Delay between readings, e.g. "500ms"
        #[bpaf(short, long, argument("DURATION"))]
        interval: Option<humantime::Duration>,
        /// Prefix each reading with the local time
        #[bpaf(short, long)]
        timestamps: bool,
    },
    /// Show the config file location and effective settings
    #[bpaf(command)]
    Config,
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    /// Increase log verbosity, repeat for more detail. RUST_LOG takes precedence.
    #[bpaf(short('v'), long("verbose"), req_flag(()), count)]
    verbose: usize,
    /// Use a config file other than the platform default
    #[bpaf(long("config"), argument("PATH"))]
    config_path: Option<PathBuf>,
    /// Serial number of the rangefinder to use, defaults to the first one found
    #[bpaf(short, long, argument("SERIAL"))]
    serial: Option<String>,
    #[bpaf(external(command))]
    command: Command,
}

fn init_logging(verbose: usize) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Take `count` readings `interval` apart, forever if `count` is 0
pub fn apply_measure(
    sensor: &mut dyn Rangefinder,
    count: u64,
    interval: Duration,
    timestamps: bool,
) -> Result<(), Box<dyn Error>> {
    let mut taken = 0u64;
    loop {
        let mm = sensor.measure()?;
        if timestamps {
            let now = chrono::Local::now();
            println!("{} {mm} mm", now.format("%Y-%m-%d %H:%M:%S%.3f"));
        } else {
            println!("{mm} mm");
        }

        taken += 1;
        if count != 0 && taken >= count {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

/// Combine a command's outcome with closing the sensor afterwards.
/// A close failure is only reported when the command itself succeeded.
fn finish<E>(result: Result<(), Box<dyn Error>>, closed: Result<(), E>) -> Result<(), Box<dyn Error>>
where
    E: Error + 'static,
{
    match (result, closed) {
        (Ok(()), closed) => closed.map_err(Into::into),
        (Err(e), Err(close_err)) => {
            warn!("failed to close sensor: {close_err}");
            Err(e)
        },
        (Err(e), Ok(())) => Err(e),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = cli().run();
    init_logging(cli.verbose);

    let config_path = Config::resolve(cli.config_path)?;
    let config = Config::load_or_create(&config_path)?;
    let serial = cli.serial.or_else(|| config.device.serial.clone());
    let timings = &config.protocol;

    match cli.command {
        Command::List => {
            let found = survey(timings)?;
            if found.is_empty() {
                println!("no {} connected", lr4::INFO.name);
            }
            for (path, serial) in found {
                match serial {
                    Ok(serial) => println!("{path}\t{serial}"),
                    Err(e) => println!("{path}\terror: {e}"),
                }
            }
            Ok(())
        },
        Command::Serial => {
            let mut sensor = open_sensor(serial.as_deref(), timings)?;
            let result = match sensor.serial_number() {
                Ok(serial) => {
                    println!("{serial}");
                    Ok(())
                },
                Err(e) => Err(e.into()),
            };
            finish(result, sensor.close())
        },
        Command::Measure {
            count,
            interval,
            timestamps,
        } => {
            let count = count.unwrap_or(config.measure.count);
            let interval = interval.map_or(config.measure.interval, Into::into);
            let timestamps = timestamps || config.measure.timestamps;

            let mut sensor = open_sensor(serial.as_deref(), timings)?;
            let result = apply_measure(&mut sensor, count, interval, timestamps);
            finish(result, sensor.close())
        },
        Command::Config => {
            println!("# {}", config_path.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use rangefinder_core::{SensorError, TransportError};

    use super::*;

    #[test]
    fn close_failure_does_not_mask_measure_error() {
        let result: Result<(), Box<dyn Error>> = Err(SensorError::DeviceNotFound.into());
        let closed = Err(SensorError::Transport(TransportError::Disconnected));
        let err = finish(result, closed).unwrap_err();
        assert_eq!(err.to_string(), "device not found");
    }

    #[test]
    fn close_failure_is_reported_after_success() {
        let closed = Err(SensorError::Transport(TransportError::Disconnected));
        let err = finish(Ok(()), closed).unwrap_err();
        assert_eq!(err.to_string(), "device disconnected");
        assert!(finish(Ok(()), Ok::<(), SensorError>(())).is_ok());
    }
}

#[cfg(test)]
#[test]
fn generate_docs() {
    let app = "lr4";
    let options = cli();

    std::fs::create_dir_all("docs").expect("failed to create docs dir");
    let roff = options.render_manpage(app, bpaf::doc::Section::General, None, None, None);
    std::fs::write("docs/lr4.1", roff).expect("failed to write manpage");

    let md = options.header("").render_markdown(app);
    std::fs::write("docs/README.md", md).expect("failed to write markdown docs");
}
