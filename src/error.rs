use thiserror::Error;

use crate::Round;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to decode message payload")]
    Encoding(#[from] bincode::Error),

    #[error("Message carries round {round}, protocol rounds start at 1")]
    InvalidRound { round: Round },

    #[error("A network of {n} nodes cannot tolerate {f} faulty members")]
    FaultBoundExceeded { n: usize, f: usize },
}
