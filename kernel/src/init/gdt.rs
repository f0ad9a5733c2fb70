use kcore::klazy;
use libx86::gdt::{GlobalDescriptorTable, Selectors};

klazy! {
    pub ref static GDT: (GlobalDescriptorTable, Selectors) = GlobalDescriptorTable::flat();
}
