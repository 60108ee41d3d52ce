use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use dotenv::dotenv;
use log::{info, initialize_logger, warn};
use serde_json::json;
use structopt::StructOpt;

use donors::config::DatabaseSettings;
use donors::db::PgDb;
use donors::donor::DonorSubmission;
use donors::errors::BackendError;
use donors::repository::DonorRepository;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "seed-donors",
    about = "Register sample donors in the configured database"
)]
struct Opt {
    /// A JSON file holding an array of registrations, in the same shape
    /// as the API's request bodies. Defaults to a built-in sample.
    #[structopt(parse(from_os_str))]
    file: Option<PathBuf>,
}

fn sample_donors() -> Vec<DonorSubmission> {
    let sample = json!([
        {"name": "Asha Rao", "bloodGroup": "B+", "age": 29, "gender": "Female", "phone": "9876543210", "city": "Pune", "state": "Maharashtra", "lastDonation": "2024-01-15"},
        {"name": "Ravi Kumar", "bloodGroup": "O+", "age": 35, "gender": "Male", "phone": "9812345678", "city": "Delhi", "state": "Delhi"},
        {"name": "Meera Nair", "bloodGroup": "A-", "age": 42, "gender": "Female", "phone": "9823456789", "city": "Kochi", "state": "Kerala", "lastDonation": "2023-11-02"},
        {"name": "Imran Shaikh", "bloodGroup": "AB+", "age": 27, "gender": "Male", "phone": "9834567890", "city": "Mumbai", "state": "Maharashtra"},
        {"name": "Priya Iyer", "bloodGroup": "O-", "age": 31, "gender": "Female", "phone": "9845678901", "city": "Chennai", "state": "Tamil Nadu", "lastDonation": "2024-03-20"},
        {"name": "Karan Singh", "bloodGroup": "B-", "age": 50, "gender": "Male", "phone": "9856789012", "city": "Bangalore", "state": "Karnataka"},
        {"name": "Neha Gupta", "bloodGroup": "A+", "age": 24, "gender": "Female", "phone": "9867890123", "city": "New Delhi", "state": "Delhi"},
        {"name": "Suresh Patel", "bloodGroup": "AB-", "age": 58, "gender": "Male", "phone": "9878901234", "city": "Ahmedabad", "state": "Gujarat", "lastDonation": "2022-08-09"}
    ]);

    serde_json::from_value(sample).expect("parse built-in sample donors")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = Arc::new(initialize_logger());

    let submissions: Vec<DonorSubmission> = match &opt.file {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => sample_donors(),
    };

    let settings = DatabaseSettings::from_env()?;
    let db = PgDb::connect_lazy(&settings)?;
    db.check_connection().await?;

    let repository = DonorRepository::new(logger.clone(), Arc::new(db));

    info!(logger, "Registering {} donors...", submissions.len());

    let mut registered = 0;

    for submission in submissions {
        let name = submission.name.clone().unwrap_or_default();
        let logger = logger.new(log::o!("name" => name));

        match repository.create(submission).await {
            Ok(id) => {
                info!(logger, "Registered donor"; "id" => id);
                registered += 1;
            }
            Err(BackendError::DuplicatePhone) => {
                warn!(logger, "Skipping donor whose phone number is already registered");
            }
            Err(e @ BackendError::Validation(..)) => {
                warn!(logger, "Skipping invalid donor: {}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(logger, "Registered {} donors", registered);

    Ok(())
}
