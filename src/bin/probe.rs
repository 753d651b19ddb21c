use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use libfuzzer_compat::{
    components::DEFAULT_MAX_SIZE,
    hooks::Hooks,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and exercise the libFuzzer hooks of a harness", long_about = None)]
struct Args {
    /// Harness compiled into a shared object
    harness: PathBuf,
    
    /// Run LLVMFuzzerCustomMutator() on this file and write the result to stdout
    #[arg(long, value_name = "FILE", conflicts_with_all = ["crossover", "run"])]
    mutate: Option<PathBuf>,
    
    /// Run LLVMFuzzerCustomCrossOver() on these files and write the result to stdout
    #[arg(long, num_args = 2, value_names = ["FILE1", "FILE2"], conflicts_with = "run")]
    crossover: Option<Vec<PathBuf>>,
    
    /// Run LLVMFuzzerTestOneInput() on this file and print its return value
    #[arg(long, value_name = "FILE")]
    run: Option<PathBuf>,
    
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    max_size: usize,
    
    #[arg(long, default_value_t = 0)]
    seed: u32,
}

fn read(path: &PathBuf) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|err| panic!("Could not read {}: {}", path.display(), err))
}

fn print_hooks(hooks: &Hooks) {
    let rows = [
        ("LLVMFuzzerTestOneInput", hooks.has_test_one_input()),
        ("LLVMFuzzerInitialize", hooks.has_libfuzzer_init()),
        ("LLVMFuzzerCustomMutator", hooks.has_libfuzzer_custom_mutator()),
        ("LLVMFuzzerCustomCrossOver", hooks.has_libfuzzer_custom_crossover()),
        ("libafl_main", hooks.main_override().is_some()),
    ];
    
    for (name, present) in rows {
        println!("{:<28}{}", name, if present { "yes" } else { "no" });
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    
    let args = Args::parse();
    let hooks = Hooks::load(&args.harness).expect("Could not load harness");
    
    if let Some(path) = &args.mutate {
        let mut data = read(path);
        let size = data.len();
        data.resize(args.max_size.max(size), 0);
        let new_size = hooks.libfuzzer_custom_mutator(&mut data, size, args.seed).expect("Could not mutate input");
        data.truncate(new_size.min(data.len()));
        std::io::stdout().write_all(&data).expect("Could not write to stdout");
    } else if let Some(paths) = &args.crossover {
        let data1 = read(&paths[0]);
        let data2 = read(&paths[1]);
        let mut out = vec![0; args.max_size];
        let written = hooks.libfuzzer_custom_crossover(&data1, &data2, &mut out, args.seed).expect("Could not cross over inputs");
        out.truncate(written.min(args.max_size));
        std::io::stdout().write_all(&out).expect("Could not write to stdout");
    } else if let Some(path) = &args.run {
        println!("{}", hooks.run_one(&read(path)));
    } else {
        print_hooks(&hooks);
    }
}
