//! Signal preparation before feature extraction

pub mod channel_mixer;
