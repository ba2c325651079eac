mod achievements;
mod catalog;
mod comments;
mod helpers;
mod library;
