pub mod pipe;

pub trait Command {
    fn execute(&mut self);
}
