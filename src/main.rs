use std::io::Read;
use std::process::ExitCode;

use floatlisp::{Environment, Value, execute, init_tracing};

fn read_source(path: Option<&str>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let path = std::env::args().nth(1);
    let source_id = path.as_deref().unwrap_or("<stdin>");
    let source = match read_source(path.as_deref()) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Cannot read {}: {}", source_id, e);
            return ExitCode::FAILURE;
        }
    };

    let global_env = Environment::new_global_populated();
    match execute(&source, &global_env) {
        Ok(Value::Unspecified) => ExitCode::SUCCESS,
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.pretty_print(source_id, &source).is_err() {
                eprintln!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}
