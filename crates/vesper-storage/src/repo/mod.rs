pub mod audio_files;
pub mod batches;
pub mod daily_reflections;
pub mod events;
pub mod mental_state_scores;
pub mod transcription_results;
pub mod users;

pub use audio_files::AudioFileRepo;
pub use batches::BatchRepo;
pub use daily_reflections::DailyReflectionRepo;
pub use events::EventRepo;
pub use mental_state_scores::MentalStateScoreRepo;
pub use transcription_results::TranscriptionResultRepo;
pub use users::UserRepo;
