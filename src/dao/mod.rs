/// Beatmap acquisition collaborator: provider trait and implementations.
pub mod beatmap;
