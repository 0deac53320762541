// src/utils/env.rs

use log::{info, warn};

/// Loads variables from a `.env` file in the working directory (or a parent),
/// leaving already-set variables untouched. A missing file is not an error.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => warn!(
            "Could not load .env file: {}. Proceeding with system environment variables.",
            e
        ),
    }
}

/// Loads variables from an explicit env file path.
pub fn load_env_from_file(file_path: &str) {
    info!(
        "Attempting to load environment variables from: {}",
        file_path
    );
    match dotenv::from_filename(file_path) {
        Ok(_) => info!("Successfully processed env file: {}", file_path),
        Err(e) => warn!(
            "Could not open env file '{}': {}. Proceeding with system environment variables.",
            file_path, e
        ),
    }
}
