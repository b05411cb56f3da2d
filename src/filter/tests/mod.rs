mod ewma;
mod offset;
