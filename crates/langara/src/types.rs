use crate::config::AppConfig;
use crate::db::{ProfessorDbManager, ScheduleDbManager, TransferDbManager};
use crate::professors::client::RateMyProfClient;
use crate::timetable::client::TimetableClient;
use crate::transfer::client::TransferGuideClient;

/// State shared by every request handler.
pub struct AppState {
    pub config: AppConfig,
    pub schedule_db: ScheduleDbManager,
    pub transfer_db: TransferDbManager,
    pub professor_db: ProfessorDbManager,
    pub timetable_client: TimetableClient,
    pub transfer_client: TransferGuideClient,
    pub professor_client: RateMyProfClient,
}

impl AppState {
    /// Opens the database and builds every upstream client from `config`.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let schedule_db = ScheduleDbManager::new(&config.database_path)?;
        let transfer_db = TransferDbManager::new(&config.database_path)?;
        let professor_db = ProfessorDbManager::new(&config.database_path)?;
        let timetable_client = TimetableClient::new(config.timetable.clone())?;
        let transfer_client = TransferGuideClient::new(config.transfer_guide.clone())?;
        let professor_client = RateMyProfClient::new(config.rate_my_professors.clone())?;

        Ok(Self {
            config,
            schedule_db,
            transfer_db,
            professor_db,
            timetable_client,
            transfer_client,
            professor_client,
        })
    }
}
