mod handle_message;
mod handle_service;
