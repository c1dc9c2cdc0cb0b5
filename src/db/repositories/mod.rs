mod blocking;
mod focus;
mod wellness;
