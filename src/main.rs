//! # Cubewar Entry Point
//!
//! Calls into the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    if let Err(err) = cubewar::run() {
        log::error!("{:#}", err);
        eprintln!("cubewar: {:#}", err);
        std::process::exit(1);
    }
}
