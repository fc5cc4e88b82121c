use android2rinex::prelude::ObservationEpoch;

pub mod fd;
pub mod observation;
pub mod settings;

/// Messages exchanged with the collecter
#[derive(Debug)]
pub enum Message {
    /// New [ObservationEpoch]
    Epoch(ObservationEpoch),
    /// Header comment, prior first epoch
    HeaderComment(String),
    /// End of conversion
    Shutdown,
}
