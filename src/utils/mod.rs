pub mod keycode;
