mod controls;
mod details;
mod palette;
mod panels;
