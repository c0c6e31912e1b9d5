pub mod achievements;
pub mod calendar;
pub mod chat;
pub mod daily_counter;
pub mod decks;
pub mod flashcard_parser;
pub mod habits;
pub mod integrated;
pub mod llm_provider;
pub mod missions;
pub mod outcome;
pub mod pomodoro;
pub mod preferences;
pub mod progress;
pub mod quick_actions;
