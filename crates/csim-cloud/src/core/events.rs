//! Standard simulation events.

// VM EVENTS ///////////////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    use crate::core::vm::VmInfo;

    #[derive(Serialize, Clone)]
    pub struct VmCreate {
        pub vm: VmInfo,
    }
}

// CLOUDLET EVENTS /////////////////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;

    #[derive(Serialize, Clone)]
    pub struct CloudletArrival {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletStart {
        pub vm_id: u32,
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletFinish {
        pub vm_id: u32,
        pub cloudlet_id: u64,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletFinished {
        pub cloudlet: Cloudlet,
    }
}

// MONITORING EVENTS ///////////////////////////////////////////////////////////////////////////////

pub mod monitoring {
    use serde::Serialize;

    #[derive(Serialize, Clone)]
    pub struct ClockTick {}
}
