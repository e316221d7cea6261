//! Command line runner for the `gaslight` library.

#[cfg(not(feature = "for-testing"))]
#[quit::main]
fn main() {
    #[cfg(feature = "cli")]
    gaslight::cli::run::run();
}

#[cfg(feature = "for-testing")]
fn main() {
    #[cfg(feature = "cli")]
    {
        eprintln!(
            "Warning: The `for-testing` feature is enabled, which will clutter error messages"
        );
        gaslight::cli::run::run();
    }
}
