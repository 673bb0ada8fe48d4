pub mod planner;
pub mod parser;
pub mod form;
pub mod display;
pub mod report;
pub mod web;
