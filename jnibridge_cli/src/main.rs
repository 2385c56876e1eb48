use clap::{Parser, Subcommand};
use jnibridge::{BridgeConfig, JavaValue, LocalScope, VmOptions};
use std::process::ExitCode;

/// Boots a JVM through jnibridge and reports what it can see.
#[derive(Parser, Debug)]
#[clap(name = "jnibridge", version, about)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the options the JVM would be created with
    Options {
        /// Name of the helper archive in the home directory
        #[clap(long, value_name = "NAME")]
        archive: Option<String>,
    },
    /// Create the JVM, then resolve classes and call their `toString`
    Probe {
        /// Pass an option to the JVM verbatim. Disables the default options
        #[clap(short = 'o', long = "option", value_name = "OPTION")]
        options: Vec<String>,

        /// Name of the helper archive in the home directory
        #[clap(long, value_name = "NAME")]
        archive: Option<String>,

        /// Classes to resolve, as internal or binary names
        #[clap(value_name = "CLASS")]
        classes: Vec<String>,
    },
}

fn vm_options(options: Vec<String>, archive: Option<String>) -> VmOptions {
    let vm_options = if options.is_empty() { VmOptions::new() } else { VmOptions::explicit(options) };
    match archive {
        Some(archive) => vm_options.archive_name(archive),
        None => vm_options,
    }
}

fn probe(options: VmOptions, archive: Option<String>, classes: &[String]) -> bool {
    let mut config = BridgeConfig::default();
    if let Some(archive) = archive {
        config.archive_name = archive.into();
    }
    if let Err(e) = jnibridge::init_jvm_with(options, config) {
        eprintln!("{e}");
        return false;
    }
    let env = match jnibridge::env() {
        Some(env) => env,
        None => {
            eprintln!("no JNI environment for the main thread");
            return false;
        }
    };

    log::info!("JVM created; resolving {} classes", classes.len());

    let mut ok = true;
    for class in classes {
        let resolved = match env.resolve_class(class) {
            Some(resolved) => resolved,
            None => {
                println!("{class}: not found");
                ok = false;
                continue;
            }
        };
        let mut scope = LocalScope::new(env);
        let text = env
            .call_method(resolved, "java/lang/Object", "toString", "()Ljava/lang/String;", &[], &mut scope)
            .and_then(JavaValue::object);
        let text: Option<String> = env.load(text, true);
        println!("{class}: {}", text.unwrap_or_default());
    }

    if let Some(fatal) = jnibridge::take_fatal() {
        eprintln!("fatal: {fatal}");
        ok = false;
    }
    ok
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let ok = match args.command {
        Command::Options { archive } => {
            for option in vm_options(Vec::new(), archive).resolve() {
                println!("{option}");
            }
            true
        }
        Command::Probe { options, archive, classes } => {
            probe(vm_options(options, archive.clone()), archive, &classes)
        }
    };
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
