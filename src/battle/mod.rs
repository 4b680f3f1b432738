pub mod ai;
pub mod controller;
pub mod state;

#[cfg(test)]
mod tests;
